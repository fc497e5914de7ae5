//! Permission records and their resolved, default-deny projections.

use crate::sdl::types::{FieldDefinition, ModelDefinition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// One stored grant per (role, table). Created lazily on first grant; never
/// auto-deleted when the table disappears from the SDL.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct TablePermission {
    pub id: Uuid,
    pub role_id: Uuid,
    pub table_name: String,
    pub can_read: bool,
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

/// One stored grant per (role, table, field).
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct FieldPermission {
    pub id: Uuid,
    pub role_id: Uuid,
    pub table_name: String,
    pub field_name: String,
    pub can_read: bool,
    pub can_update: bool,
}

/// Partial flag update: present flags overwrite, omitted flags keep their
/// stored value (or default to false on first insert).
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct TableFlagsPatch {
    #[serde(default)]
    pub can_read: Option<bool>,
    #[serde(default)]
    pub can_create: Option<bool>,
    #[serde(default)]
    pub can_update: Option<bool>,
    #[serde(default)]
    pub can_delete: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct FieldFlagsPatch {
    #[serde(default)]
    pub can_read: Option<bool>,
    #[serde(default)]
    pub can_update: Option<bool>,
}

/// Effective table flags exposed to callers. Default is deny on all four.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TableFlags {
    pub can_read: bool,
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl From<&TablePermission> for TableFlags {
    fn from(row: &TablePermission) -> Self {
        Self {
            can_read: row.can_read,
            can_create: row.can_create,
            can_update: row.can_update,
            can_delete: row.can_delete,
        }
    }
}

/// Effective field flags: the conjunction of table-level and field-level grants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FieldFlags {
    pub can_read: bool,
    pub can_update: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct TableWithPermissions {
    #[serde(flatten)]
    pub model: ModelDefinition,
    /// Id of the backing row, when an explicit grant exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_id: Option<Uuid>,
    pub permissions: TableFlags,
}

#[derive(Clone, Debug, Serialize)]
pub struct FieldWithPermissions {
    #[serde(flatten)]
    pub field: FieldDefinition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_id: Option<Uuid>,
    pub permissions: FieldFlags,
}
