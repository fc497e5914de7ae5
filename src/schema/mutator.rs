//! Staging of schema mutations: pure text transforms over a snapshot of the
//! committed SDL. Nothing here writes the store — the pipeline decides whether
//! a staged document becomes authoritative.

use crate::error::EngineError;
use crate::sdl::parser::{contains_model_ci, find_model_block, parse_model_fields};
use crate::sdl::synth::synthesize_model;
use crate::sdl::types::{is_scalar_type, FieldDefinition};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Partial update for one table. Omitted parts keep their current values.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TablePatch {
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<FieldDefinition>>,
}

fn ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("ident regex"))
}

fn validate_table_name(name: &str) -> Result<(), EngineError> {
    if !ident_re().is_match(name) {
        return Err(EngineError::Validation(format!(
            "table name '{}' must be a letter followed by letters, digits, or underscores",
            name
        )));
    }
    Ok(())
}

fn validate_fields(fields: &[FieldDefinition]) -> Result<(), EngineError> {
    if fields.is_empty() {
        return Err(EngineError::Validation("at least one field is required".into()));
    }
    for field in fields {
        if !ident_re().is_match(&field.name) {
            return Err(EngineError::Validation(format!(
                "field name '{}' must be a letter followed by letters, digits, or underscores",
                field.name
            )));
        }
        if !is_scalar_type(&field.type_name) {
            return Err(EngineError::Validation(format!(
                "unknown type '{}' for field '{}'",
                field.type_name, field.name
            )));
        }
    }
    Ok(())
}

/// Append a new model block. Duplicate names are rejected case-insensitively
/// so `loan` cannot shadow an existing `Loan`.
pub fn stage_create(
    current: &str,
    name: &str,
    description: &str,
    fields: &[FieldDefinition],
) -> Result<String, EngineError> {
    validate_table_name(name)?;
    validate_fields(fields)?;
    if contains_model_ci(current, name) {
        return Err(EngineError::DuplicateTable(name.to_string()));
    }

    let block = synthesize_model(name, description, fields);
    let base = current.trim_end();
    if base.is_empty() {
        Ok(format!("{}\n", block))
    } else {
        Ok(format!("{}\n\n{}\n", base, block))
    }
}

/// Replace a block wholesale with a freshly synthesized one. A rename that
/// collides with a different existing table is rejected; renaming only the
/// casing of the same table is allowed.
pub fn stage_update(current: &str, table: &str, patch: &TablePatch) -> Result<String, EngineError> {
    let block = find_model_block(current, table)
        .ok_or_else(|| EngineError::TableNotFound(table.to_string()))?;
    let parsed = parse_model_fields(current, table)
        .ok_or_else(|| EngineError::TableNotFound(table.to_string()))?;

    let new_name = patch.new_name.as_deref().unwrap_or(table);
    validate_table_name(new_name)?;
    if !new_name.eq_ignore_ascii_case(table) && contains_model_ci(current, new_name) {
        return Err(EngineError::DuplicateTable(new_name.to_string()));
    }

    let description = patch.description.as_deref().unwrap_or(&parsed.description);
    let fields = patch.fields.as_deref().unwrap_or(&parsed.fields);
    validate_fields(fields)?;

    let replacement = synthesize_model(new_name, description, fields);
    let mut staged = String::with_capacity(current.len() + replacement.len());
    staged.push_str(&current[..block.span.start]);
    staged.push_str(&replacement);
    staged.push_str(&current[block.span.end..]);
    Ok(staged)
}

/// Remove a block and the blank padding around it.
pub fn stage_delete(current: &str, table: &str) -> Result<String, EngineError> {
    let block = find_model_block(current, table)
        .ok_or_else(|| EngineError::TableNotFound(table.to_string()))?;

    let before = current[..block.span.start].trim_end();
    let after = current[block.span.end..].trim_start();
    let staged = match (before.is_empty(), after.is_empty()) {
        (true, true) => String::new(),
        (true, false) => format!("{}\n", after.trim_end()),
        (false, true) => format!("{}\n", before),
        (false, false) => format!("{}\n\n{}\n", before, after.trim_end()),
    };
    Ok(staged)
}
