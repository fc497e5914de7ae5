//! Two-level role-based access control resolved against the current schema.

pub mod resolver;
pub mod store;
pub mod types;

pub use resolver::PermissionResolver;
pub use store::{ensure_permission_tables, PermissionStore};
pub use types::{
    FieldFlags, FieldFlagsPatch, FieldPermission, FieldWithPermissions, Role, TableFlags,
    TableFlagsPatch, TablePermission, TableWithPermissions,
};
