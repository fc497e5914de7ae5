//! Postgres-backed store tests. Skipped unless TEST_DATABASE_URL is set, so
//! the suite stays green without a database while CI with one gets full
//! coverage of the upsert and resolution SQL.

use schemakit::permission::resolver::PermissionResolver;
use schemakit::permission::store::{ensure_permission_tables, PermissionStore};
use schemakit::permission::types::{FieldFlagsPatch, TableFlagsPatch};
use schemakit::sdl::store::SdlStore;
use schemakit::EngineError;
use std::sync::Arc;
use uuid::Uuid;

async fn test_pool() -> Option<sqlx::PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    ensure_permission_tables(&pool).await.expect("ensure tables");
    Some(pool)
}

fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

#[tokio::test]
async fn upsert_preserves_unspecified_flags() {
    let Some(pool) = test_pool().await else { return };
    let store = PermissionStore::new(pool);
    let role = store
        .create_role(&unique_name("auditor"), "read-only reviews")
        .await
        .expect("create role");

    store
        .set_table_permission(
            role.id,
            "Loan",
            TableFlagsPatch {
                can_read: Some(true),
                ..TableFlagsPatch::default()
            },
        )
        .await
        .expect("first grant");
    let row = store
        .set_table_permission(
            role.id,
            "Loan",
            TableFlagsPatch {
                can_create: Some(true),
                ..TableFlagsPatch::default()
            },
        )
        .await
        .expect("second grant");

    assert!(row.can_read, "earlier grant must survive the upsert");
    assert!(row.can_create);
    assert!(!row.can_update);
    assert!(!row.can_delete);

    // One row per (role, table): both writes landed on the same id.
    let rows = store.table_permissions_for_role(role.id).await.expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, row.id);

    store.delete_role(role.id).await.expect("cleanup");
}

#[tokio::test]
async fn field_upsert_is_keyed_on_the_triple() {
    let Some(pool) = test_pool().await else { return };
    let store = PermissionStore::new(pool);
    let role = store
        .create_role(&unique_name("clerk"), "")
        .await
        .expect("create role");

    store
        .set_field_permission(
            role.id,
            "Loan",
            "amount",
            FieldFlagsPatch {
                can_read: Some(true),
                ..FieldFlagsPatch::default()
            },
        )
        .await
        .expect("first grant");
    let row = store
        .set_field_permission(
            role.id,
            "Loan",
            "amount",
            FieldFlagsPatch {
                can_update: Some(true),
                ..FieldFlagsPatch::default()
            },
        )
        .await
        .expect("second grant");
    assert!(row.can_read && row.can_update);

    let rows = store
        .field_permissions_for_role(role.id, "Loan")
        .await
        .expect("list");
    assert_eq!(rows.len(), 1);

    store.delete_role(role.id).await.expect("cleanup");
}

#[tokio::test]
async fn deleting_a_missing_permission_id_is_an_error() {
    let Some(pool) = test_pool().await else { return };
    let store = PermissionStore::new(pool);
    let err = store.delete_table_permission(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::PermissionNotFound(_)));
    let err = store.delete_field_permission(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::PermissionNotFound(_)));
}

#[tokio::test]
async fn duplicate_role_name_conflicts() {
    let Some(pool) = test_pool().await else { return };
    let store = PermissionStore::new(pool);
    let name = unique_name("underwriter");
    let role = store.create_role(&name, "").await.expect("create role");
    let err = store.create_role(&name, "").await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    store.delete_role(role.id).await.expect("cleanup");
}

#[tokio::test]
async fn grant_for_unknown_role_reports_role_not_found() {
    let Some(pool) = test_pool().await else { return };
    let store = PermissionStore::new(pool);
    let err = store
        .set_table_permission(
            Uuid::new_v4(),
            "Loan",
            TableFlagsPatch {
                can_read: Some(true),
                ..TableFlagsPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RoleNotFound(_)));
}

#[tokio::test]
async fn resolver_gates_field_reads_by_table_permission() {
    let Some(pool) = test_pool().await else { return };
    let store = PermissionStore::new(pool.clone());
    let role = store
        .create_role(&unique_name("teller"), "")
        .await
        .expect("create role");

    let dir = std::env::temp_dir().join(format!("schemakit_resolver_{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let sdl_path = dir.join("schema.sdl");
    std::fs::write(
        &sdl_path,
        "model Loan {\n  id String @unique\n  amount Decimal\n}\n",
    )
    .unwrap();
    let sdl = Arc::new(SdlStore::open(&sdl_path).await.expect("open sdl"));
    let resolver = PermissionResolver::new(store.clone(), sdl);

    // Field grant exists, table grant does not: effective read stays false.
    store
        .set_field_permission(
            role.id,
            "Loan",
            "amount",
            FieldFlagsPatch {
                can_read: Some(true),
                ..FieldFlagsPatch::default()
            },
        )
        .await
        .expect("field grant");
    let fields = resolver
        .list_fields_with_permissions(role.id, "Loan")
        .await
        .expect("resolve fields");
    assert!(fields.iter().all(|f| !f.permissions.can_read));

    // Granting table read lifts the gate for the granted field only.
    store
        .set_table_permission(
            role.id,
            "Loan",
            TableFlagsPatch {
                can_read: Some(true),
                ..TableFlagsPatch::default()
            },
        )
        .await
        .expect("table grant");
    let fields = resolver
        .list_fields_with_permissions(role.id, "Loan")
        .await
        .expect("resolve fields");
    let amount = fields.iter().find(|f| f.field.name == "amount").unwrap();
    let id = fields.iter().find(|f| f.field.name == "id").unwrap();
    assert!(amount.permissions.can_read);
    assert!(!id.permissions.can_read, "ungranted field stays denied");

    // Table listing: the granted table carries its row, everything else denies.
    let tables = resolver
        .list_tables_with_permissions(role.id)
        .await
        .expect("resolve tables");
    assert_eq!(tables.len(), 1);
    assert!(tables[0].permissions.can_read);
    assert!(tables[0].permission_id.is_some());

    store.delete_role(role.id).await.expect("cleanup");
}
