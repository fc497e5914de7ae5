//! Effective-permission resolution: the current SDL left-joined against stored
//! grants. Deny by default is the hard invariant — the absence of a grant is
//! never an implicit allow — and field access is gated by table access.

use crate::error::EngineError;
use crate::permission::store::PermissionStore;
use crate::permission::types::{
    FieldFlags, FieldPermission, FieldWithPermissions, TableFlags, TablePermission,
    TableWithPermissions,
};
use crate::sdl::parser::{parse_model_fields, parse_models};
use crate::sdl::store::SdlStore;
use crate::sdl::types::{FieldDefinition, ModelDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Left-join tables against stored grants by name. Tables with no row get all
/// four flags false; dangling rows for tables no longer in the SDL are ignored.
pub fn resolve_tables(
    models: Vec<ModelDefinition>,
    rows: &[TablePermission],
) -> Vec<TableWithPermissions> {
    let by_name: HashMap<&str, &TablePermission> =
        rows.iter().map(|r| (r.table_name.as_str(), r)).collect();
    models
        .into_iter()
        .map(|model| {
            let row = by_name.get(model.name.as_str());
            TableWithPermissions {
                permission_id: row.map(|r| r.id),
                permissions: row.map(|r| TableFlags::from(*r)).unwrap_or_default(),
                model,
            }
        })
        .collect()
}

/// Left-join fields against stored grants, then gate by the table flags:
/// a field grant under a table the role cannot read grants nothing.
pub fn resolve_fields(
    fields: Vec<FieldDefinition>,
    table: TableFlags,
    rows: &[FieldPermission],
) -> Vec<FieldWithPermissions> {
    let by_name: HashMap<&str, &FieldPermission> =
        rows.iter().map(|r| (r.field_name.as_str(), r)).collect();
    fields
        .into_iter()
        .map(|field| {
            let row = by_name.get(field.name.as_str());
            let stored = row
                .map(|r| FieldFlags {
                    can_read: r.can_read,
                    can_update: r.can_update,
                })
                .unwrap_or_default();
            FieldWithPermissions {
                permission_id: row.map(|r| r.id),
                permissions: FieldFlags {
                    can_read: table.can_read && stored.can_read,
                    can_update: table.can_update && stored.can_update,
                },
                field,
            }
        })
        .collect()
}

/// DB-backed entry points. Each call reads one SDL snapshot at its start;
/// schema mutations committed afterwards are intentionally not reflected.
pub struct PermissionResolver {
    store: PermissionStore,
    sdl: Arc<SdlStore>,
}

impl PermissionResolver {
    pub fn new(store: PermissionStore, sdl: Arc<SdlStore>) -> Self {
        Self { store, sdl }
    }

    pub async fn list_tables_with_permissions(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<TableWithPermissions>, EngineError> {
        let snapshot = self.sdl.snapshot().await;
        let models = parse_models(&snapshot);
        let rows = self.store.table_permissions_for_role(role_id).await?;
        Ok(resolve_tables(models, &rows))
    }

    pub async fn list_fields_with_permissions(
        &self,
        role_id: Uuid,
        table_name: &str,
    ) -> Result<Vec<FieldWithPermissions>, EngineError> {
        let snapshot = self.sdl.snapshot().await;
        let parsed = parse_model_fields(&snapshot, table_name)
            .ok_or_else(|| EngineError::TableNotFound(table_name.to_string()))?;
        let table_flags = self
            .store
            .table_permission_for(role_id, table_name)
            .await?
            .as_ref()
            .map(TableFlags::from)
            .unwrap_or_default();
        let rows = self
            .store
            .field_permissions_for_role(role_id, table_name)
            .await?;
        Ok(resolve_fields(parsed.fields, table_flags, &rows))
    }
}
