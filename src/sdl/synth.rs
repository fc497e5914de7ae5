//! SDL synthesis: the inverse of the parser for the grammar subset it accepts.

use crate::sdl::types::FieldDefinition;

/// Render one model block. The description comment goes on the first body line
/// so a subsequent parse recovers it; fields keep the given order.
///
/// Round-trip law: `parse_model_fields(&synthesize_model(n, d, f), n)`
/// yields `n`, `d`, and `f` unchanged for any fields expressible in the grammar.
pub fn synthesize_model(name: &str, description: &str, fields: &[FieldDefinition]) -> String {
    let mut out = String::new();
    out.push_str(&format!("model {} {{\n", name));
    if !description.is_empty() {
        out.push_str(&format!("  // Description: {}\n", description));
    }
    for field in fields {
        out.push_str("  ");
        out.push_str(&field_line(field));
        out.push('\n');
    }
    out.push('}');
    out
}

fn field_line(field: &FieldDefinition) -> String {
    let mut line = format!("{} {}", field.name, field.type_name);
    if !field.required {
        line.push('?');
    }
    if field.unique {
        line.push_str(" @unique");
    }
    if let Some(ref default) = field.default {
        line.push_str(&format!(" @default({})", default));
    }
    if !field.description.is_empty() {
        line.push_str(&format!(" // {}", field.description));
    }
    line
}
