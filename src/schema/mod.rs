//! Schema mutation: staging, the external migration pipeline, and the
//! serialized service tying them to the SDL store.

pub mod mutator;
pub mod pipeline;
pub mod service;

pub use mutator::TablePatch;
pub use pipeline::{CommandMigrationTool, MigrationPipeline, MigrationTool, PipelineStep};
pub use service::SchemaService;
