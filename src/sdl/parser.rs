//! SDL parsing: model blocks and field lines. Tolerant by contract — malformed
//! input degrades to empty results, never errors, so listing callers can render
//! "no tables" instead of failing the request.

use crate::sdl::types::{FieldDefinition, ModelDefinition, ModelFields};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

fn model_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"model\s+([A-Za-z_][A-Za-z0-9_]*)\s*\{([^}]*)\}").expect("model block regex")
    })
}

fn description_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"//\s*Description:\s*(.*)").expect("description regex"))
}

fn default_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@default\(([^)]*)\)").expect("default regex"))
}

/// A located model block: byte span of the whole `model ... { ... }` match
/// plus its body. Used by the mutator for splice-by-span editing.
#[derive(Clone, Debug)]
pub struct ModelBlock {
    pub name: String,
    pub span: Range<usize>,
    pub body: String,
}

/// All model blocks in source order.
pub fn model_blocks(text: &str) -> Vec<ModelBlock> {
    model_block_re()
        .captures_iter(text)
        .map(|cap| {
            let whole = cap.get(0).expect("whole match");
            ModelBlock {
                name: cap[1].to_string(),
                span: whole.start()..whole.end(),
                body: cap[2].to_string(),
            }
        })
        .collect()
}

/// Locate one block by exact name.
pub fn find_model_block(text: &str, name: &str) -> Option<ModelBlock> {
    model_blocks(text).into_iter().find(|b| b.name == name)
}

/// True if any block's name matches case-insensitively. Duplicate detection
/// compares this way so `loan` and `Loan` cannot coexist.
pub fn contains_model_ci(text: &str, name: &str) -> bool {
    model_blocks(text)
        .iter()
        .any(|b| b.name.eq_ignore_ascii_case(name))
}

/// Scan for model blocks and summarize each. Ordering follows block order in
/// the source; a body with no `// Description:` comment yields an empty string.
pub fn parse_models(text: &str) -> Vec<ModelDefinition> {
    model_blocks(text)
        .iter()
        .map(|block| ModelDefinition {
            name: block.name.clone(),
            description: body_description(&block.body),
            field_count: field_line_count(&block.body),
        })
        .collect()
}

/// Parse one named block into its fields. `None` on a missing block is a
/// non-fatal miss, not an error.
pub fn parse_model_fields(text: &str, model_name: &str) -> Option<ModelFields> {
    let block = find_model_block(text, model_name)?;
    let fields = block.body.lines().filter_map(parse_field_line).collect();
    Some(ModelFields {
        name: block.name,
        description: body_description(&block.body),
        fields,
    })
}

fn body_description(body: &str) -> String {
    description_re()
        .captures(body)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default()
}

/// Non-blank, non-comment-only body lines.
fn field_line_count(body: &str) -> usize {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("//"))
        .count()
}

/// One field line: `name type[?] [@unique] [@default(v)] [// description]`.
/// Lines that do not resolve to at least a name and a type token are skipped.
fn parse_field_line(line: &str) -> Option<FieldDefinition> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("//") {
        return None;
    }
    let (code, comment) = match line.find("//") {
        Some(i) => (&line[..i], line[i + 2..].trim()),
        None => (line, ""),
    };
    let mut tokens = code.split_whitespace();
    let name = tokens.next()?;
    let type_token = tokens.next()?;

    let (type_name, required) = match type_token.strip_suffix('?') {
        Some(bare) => (bare, false),
        None => (type_token, true),
    };
    // Only the first @default(...) occurrence is honored.
    let default = default_re().captures(code).map(|c| c[1].to_string());

    Some(FieldDefinition {
        name: name.to_string(),
        type_name: type_name.to_string(),
        required,
        unique: code.contains("@unique"),
        default,
        description: comment.to_string(),
    })
}
