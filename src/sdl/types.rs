//! Transient projections of the SDL document. Never persisted: re-derived on every parse.

use serde::{Deserialize, Serialize};

/// Scalar types accepted in field definitions, as surfaced by `list_data_types`.
pub const SCALAR_TYPES: &[&str] = &[
    "String", "Boolean", "Int", "BigInt", "Float", "Decimal", "DateTime", "Json", "Bytes",
];

pub fn is_scalar_type(name: &str) -> bool {
    SCALAR_TYPES.contains(&name)
}

/// One `model <Name> { ... }` block, summarized. `description` is empty (not null)
/// when the block has no `// Description:` comment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub description: String,
    pub field_count: usize,
}

/// One field line inside a model block. Order within a model is significant
/// and preserved from source order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub required: bool,
    pub unique: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Full parse of a single named block: the model plus its fields in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFields {
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldDefinition>,
}
