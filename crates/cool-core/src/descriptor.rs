//! Descriptor line parsing.
//!
//! Entity loaders ask cleartool for a fixed, ordered set of attributes in a
//! single `describe -fmt` call. The response is one line whose fields are
//! separated by the literal `}{`. The parser has no schema beyond the field
//! count, so a count mismatch always means the query template and the
//! caller have drifted apart.

/// Separator between primary descriptor fields.
pub const FIELD_SEPARATOR: &str = "}{";

/// A descriptor line did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed descriptor: expected {expected} fields, found {found} in {line:?}")]
pub struct DescriptorError {
    /// Number of fields the query template asked for.
    pub expected: usize,
    /// Number of fields the response actually contained.
    pub found: usize,
    /// The raw response line.
    pub line: String,
}

/// Splits a descriptor line into exactly `expected` raw fields.
///
/// Empty fields come back as empty strings. Only the trailing line
/// terminator is stripped; fields are otherwise left untouched.
pub fn split_fields(line: &str, expected: usize) -> Result<Vec<String>, DescriptorError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<String> = line.split(FIELD_SEPARATOR).map(str::to_owned).collect();

    if fields.len() != expected {
        return Err(DescriptorError {
            expected,
            found: fields.len(),
            line: line.to_owned(),
        });
    }

    Ok(fields)
}

/// Splits a whitespace-separated sub-list (baseline lists).
pub fn split_space_list(field: &str) -> Vec<String> {
    field.split_whitespace().map(str::to_owned).collect()
}

/// Splits a comma-separated sub-list (stream lists).
pub fn split_comma_list(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Returns `Some(trimmed)` for a non-blank field, `None` otherwise.
pub fn optional_field(field: &str) -> Option<&str> {
    let trimmed = field.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
