//! Schema definition language: parse, synthesize, and store model blocks.

pub mod parser;
pub mod store;
pub mod synth;
pub mod types;

pub use parser::{find_model_block, parse_model_fields, parse_models};
pub use store::SdlStore;
pub use synth::synthesize_model;
pub use types::{FieldDefinition, ModelDefinition, ModelFields, SCALAR_TYPES};
