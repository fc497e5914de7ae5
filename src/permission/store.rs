//! Role and permission persistence. All tables live in a schema named from
//! `SCHEMAKIT_SCHEMA` env (default `schemakit`); grants are upserted by their
//! unique key so omitted flags keep their stored values.

use crate::error::EngineError;
use crate::permission::types::{
    FieldFlagsPatch, FieldPermission, Role, TableFlagsPatch, TablePermission,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Schema name for permission tables. Must be a valid PostgreSQL identifier.
pub fn permission_schema() -> String {
    std::env::var("SCHEMAKIT_SCHEMA").unwrap_or_else(|_| "schemakit".into())
}

fn qualified(table: &str) -> String {
    format!("{}.{}", permission_schema(), table)
}

/// Create the permission schema and tables if absent. Idempotent; call at startup.
pub async fn ensure_permission_tables(pool: &PgPool) -> Result<(), EngineError> {
    let schema = permission_schema();
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
        .execute(pool)
        .await?;

    let roles_ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        qualified("roles")
    );
    sqlx::query(&roles_ddl).execute(pool).await?;

    let table_perms_ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            role_id UUID NOT NULL REFERENCES {} (id) ON DELETE CASCADE,
            table_name TEXT NOT NULL,
            can_read BOOLEAN NOT NULL DEFAULT FALSE,
            can_create BOOLEAN NOT NULL DEFAULT FALSE,
            can_update BOOLEAN NOT NULL DEFAULT FALSE,
            can_delete BOOLEAN NOT NULL DEFAULT FALSE,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (role_id, table_name)
        )
        "#,
        qualified("table_permissions"),
        qualified("roles")
    );
    sqlx::query(&table_perms_ddl).execute(pool).await?;

    let field_perms_ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            role_id UUID NOT NULL REFERENCES {} (id) ON DELETE CASCADE,
            table_name TEXT NOT NULL,
            field_name TEXT NOT NULL,
            can_read BOOLEAN NOT NULL DEFAULT FALSE,
            can_update BOOLEAN NOT NULL DEFAULT FALSE,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (role_id, table_name, field_name)
        )
        "#,
        qualified("field_permissions"),
        qualified("roles")
    );
    sqlx::query(&field_perms_ddl).execute(pool).await?;

    Ok(())
}

fn map_db_error(e: sqlx::Error, role_id: Uuid) -> EngineError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return EngineError::Conflict(db.message().to_string());
        }
        if db.is_foreign_key_violation() {
            return EngineError::RoleNotFound(role_id.to_string());
        }
    }
    EngineError::Db(e)
}

#[derive(Clone)]
pub struct PermissionStore {
    pool: PgPool,
}

impl PermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_role(&self, name: &str, description: &str) -> Result<Role, EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::Validation("role name is required".into()));
        }
        let sql = format!(
            "INSERT INTO {} (name, description) VALUES ($1, $2) RETURNING id, name, description, created_at",
            qualified("roles")
        );
        tracing::debug!(sql = %sql, "query");
        sqlx::query_as::<_, Role>(&sql)
            .bind(name)
            .bind(description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    EngineError::Conflict(format!("role '{}' already exists", name))
                }
                _ => EngineError::Db(e),
            })
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, EngineError> {
        let sql = format!(
            "SELECT id, name, description, created_at FROM {} ORDER BY name",
            qualified("roles")
        );
        tracing::debug!(sql = %sql, "query");
        Ok(sqlx::query_as::<_, Role>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get_role(&self, id: Uuid) -> Result<Role, EngineError> {
        let sql = format!(
            "SELECT id, name, description, created_at FROM {} WHERE id = $1",
            qualified("roles")
        );
        tracing::debug!(sql = %sql, "query");
        sqlx::query_as::<_, Role>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| EngineError::RoleNotFound(id.to_string()))
    }

    /// Patch name and/or description; omitted parts keep their values.
    pub async fn update_role(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Role, EngineError> {
        let sql = format!(
            "UPDATE {} SET name = COALESCE($2, name), description = COALESCE($3, description) \
             WHERE id = $1 RETURNING id, name, description, created_at",
            qualified("roles")
        );
        tracing::debug!(sql = %sql, "query");
        sqlx::query_as::<_, Role>(&sql)
            .bind(id)
            .bind(name)
            .bind(description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    EngineError::Conflict("role name already in use".into())
                }
                _ => EngineError::Db(e),
            })?
            .ok_or_else(|| EngineError::RoleNotFound(id.to_string()))
    }

    /// Hard delete. The block on deleting a role still assigned to users is
    /// owned by the user/role association outside this engine.
    pub async fn delete_role(&self, id: Uuid) -> Result<(), EngineError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", qualified("roles"));
        tracing::debug!(sql = %sql, "query");
        let done = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if done.rows_affected() == 0 {
            return Err(EngineError::RoleNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Upsert by (role, table): present flags overwrite, omitted flags keep
    /// their stored value, and a fresh row defaults omitted flags to false.
    pub async fn set_table_permission(
        &self,
        role_id: Uuid,
        table_name: &str,
        patch: TableFlagsPatch,
    ) -> Result<TablePermission, EngineError> {
        let table = qualified("table_permissions");
        let sql = format!(
            "INSERT INTO {t} (role_id, table_name, can_read, can_create, can_update, can_delete) \
             VALUES ($1, $2, COALESCE($3, FALSE), COALESCE($4, FALSE), COALESCE($5, FALSE), COALESCE($6, FALSE)) \
             ON CONFLICT (role_id, table_name) DO UPDATE SET \
             can_read = COALESCE($3, {t}.can_read), \
             can_create = COALESCE($4, {t}.can_create), \
             can_update = COALESCE($5, {t}.can_update), \
             can_delete = COALESCE($6, {t}.can_delete), \
             updated_at = NOW() \
             RETURNING id, role_id, table_name, can_read, can_create, can_update, can_delete",
            t = table
        );
        tracing::debug!(sql = %sql, role_id = %role_id, table_name, "query");
        sqlx::query_as::<_, TablePermission>(&sql)
            .bind(role_id)
            .bind(table_name)
            .bind(patch.can_read)
            .bind(patch.can_create)
            .bind(patch.can_update)
            .bind(patch.can_delete)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, role_id))
    }

    /// Same upsert discipline keyed on the (role, table, field) triple.
    pub async fn set_field_permission(
        &self,
        role_id: Uuid,
        table_name: &str,
        field_name: &str,
        patch: FieldFlagsPatch,
    ) -> Result<FieldPermission, EngineError> {
        let table = qualified("field_permissions");
        let sql = format!(
            "INSERT INTO {t} (role_id, table_name, field_name, can_read, can_update) \
             VALUES ($1, $2, $3, COALESCE($4, FALSE), COALESCE($5, FALSE)) \
             ON CONFLICT (role_id, table_name, field_name) DO UPDATE SET \
             can_read = COALESCE($4, {t}.can_read), \
             can_update = COALESCE($5, {t}.can_update), \
             updated_at = NOW() \
             RETURNING id, role_id, table_name, field_name, can_read, can_update",
            t = table
        );
        tracing::debug!(sql = %sql, role_id = %role_id, table_name, field_name, "query");
        sqlx::query_as::<_, FieldPermission>(&sql)
            .bind(role_id)
            .bind(table_name)
            .bind(field_name)
            .bind(patch.can_read)
            .bind(patch.can_update)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, role_id))
    }

    /// Hard delete by row id. Not idempotent: a missing id is an error.
    pub async fn delete_table_permission(&self, id: Uuid) -> Result<(), EngineError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", qualified("table_permissions"));
        tracing::debug!(sql = %sql, "query");
        let done = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if done.rows_affected() == 0 {
            return Err(EngineError::PermissionNotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn delete_field_permission(&self, id: Uuid) -> Result<(), EngineError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", qualified("field_permissions"));
        tracing::debug!(sql = %sql, "query");
        let done = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if done.rows_affected() == 0 {
            return Err(EngineError::PermissionNotFound(id.to_string()));
        }
        Ok(())
    }

    /// All stored table grants for one role, dangling ones included.
    pub async fn table_permissions_for_role(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<TablePermission>, EngineError> {
        let sql = format!(
            "SELECT id, role_id, table_name, can_read, can_create, can_update, can_delete \
             FROM {} WHERE role_id = $1 ORDER BY table_name",
            qualified("table_permissions")
        );
        tracing::debug!(sql = %sql, role_id = %role_id, "query");
        Ok(sqlx::query_as::<_, TablePermission>(&sql)
            .bind(role_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// The single stored grant for (role, table), if any.
    pub async fn table_permission_for(
        &self,
        role_id: Uuid,
        table_name: &str,
    ) -> Result<Option<TablePermission>, EngineError> {
        let sql = format!(
            "SELECT id, role_id, table_name, can_read, can_create, can_update, can_delete \
             FROM {} WHERE role_id = $1 AND table_name = $2",
            qualified("table_permissions")
        );
        tracing::debug!(sql = %sql, role_id = %role_id, table_name, "query");
        Ok(sqlx::query_as::<_, TablePermission>(&sql)
            .bind(role_id)
            .bind(table_name)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn field_permissions_for_role(
        &self,
        role_id: Uuid,
        table_name: &str,
    ) -> Result<Vec<FieldPermission>, EngineError> {
        let sql = format!(
            "SELECT id, role_id, table_name, field_name, can_read, can_update \
             FROM {} WHERE role_id = $1 AND table_name = $2 ORDER BY field_name",
            qualified("field_permissions")
        );
        tracing::debug!(sql = %sql, role_id = %role_id, table_name, "query");
        Ok(sqlx::query_as::<_, FieldPermission>(&sql)
            .bind(role_id)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await?)
    }
}
