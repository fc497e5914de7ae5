//! Schemakit: runtime-mutable schema definitions with two-level role-based
//! permissions, synchronized to PostgreSQL through external migration tooling.

pub mod config;
pub mod error;
pub mod permission;
pub mod schema;
pub mod sdl;
pub mod state;

pub use config::EngineConfig;
pub use error::EngineError;
pub use permission::{
    ensure_permission_tables, FieldFlagsPatch, PermissionResolver, PermissionStore, Role,
    TableFlagsPatch,
};
pub use schema::{CommandMigrationTool, MigrationPipeline, MigrationTool, SchemaService, TablePatch};
pub use sdl::{parse_model_fields, parse_models, synthesize_model, FieldDefinition, ModelDefinition, SdlStore};
pub use state::EngineState;
