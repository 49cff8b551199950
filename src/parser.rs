//! Tolerant parsing of completion-service replies into structured records.
//!
//! The completion service is untrusted: replies may be valid JSON, JSON
//! wrapped in markdown fences, JSON buried in prose, truncated structure, or
//! plain text. This module recovers whatever structure it can and never
//! raises to its caller — the guarantee every pipeline stage depends on to
//! keep publishing.
//!
//! Recovery steps, first success wins:
//! 1. empty or whitespace-only input → empty record list
//! 2. strip fence markers and language tags
//! 3. direct structural parse of the cleaned text
//! 4. bracket-scan the first balanced object/array substring, retry the parse
//! 5. synthesize exactly one fallback record so the fact that the stage ran
//!    is never silently lost
//!
//! # Examples
//!
//! ```
//! use flowlint::message::StageName;
//! use flowlint::parser::parse_error_records;
//!
//! let checker = StageName::new("checker");
//! let raw = r#"Happy to help! Here is the report:
//! [{"error_type": "deadlock", "description": "no merge", "suggestion": "add a join"}]
//! Anything else?"#;
//! let records = parse_error_records(&checker, raw);
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].error_type, "deadlock");
//! ```

use serde_json::Value;

use crate::message::StageName;
use crate::records::{ErrorRecord, NO_SUGGESTION, PARSE_ERROR_TYPE};

/// Fixed guidance attached to the synthesized fallback record.
pub const FALLBACK_SUGGESTION: &str =
    "verify that the generation service replied with the agreed JSON report layout";

/// Upper bound, in characters, on the raw-text prefix preserved in a
/// fallback record's description.
pub const DESCRIPTION_PREFIX_LIMIT: usize = 160;

const UNKNOWN_ERROR_TYPE: &str = "unknown";
const NO_DESCRIPTION: &str = "(no description)";

/// Extracts error records from an arbitrary service reply.
///
/// Always returns a list; see the module docs for the recovery ladder. When
/// the input contains exactly one well-formed record array, the returned
/// list equals the decoded array.
#[must_use]
pub fn parse_error_records(source: &StageName, raw: &str) -> Vec<ErrorRecord> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let cleaned = strip_fences(raw);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned)
        && let Some(records) = records_from_value(source, &value)
    {
        return records;
    }

    if let Some(fragment) = balanced_fragment(&cleaned)
        && let Ok(value) = serde_json::from_str::<Value>(fragment)
        && let Some(records) = records_from_value(source, &value)
    {
        return records;
    }

    tracing::warn!(
        source = %source,
        preview = %bounded_prefix(raw, 80),
        "reply contained no recoverable record structure, keeping fallback record"
    );
    vec![fallback_record(source, raw)]
}

/// Removes markdown fence lines (with or without a language tag) from a
/// reply, leaving the fenced body intact.
#[must_use]
pub fn strip_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

/// Normalizes diagram text chosen for rendering: fence markers removed and
/// escaped line breaks restored. Applied only to diagram payloads, where a
/// literal `\n` is a formatting artifact rather than content.
#[must_use]
pub fn normalize_diagram_text(text: &str) -> String {
    strip_fences(text).replace("\\n", "\n").trim().to_string()
}

/// A char-boundary-safe prefix of `text`, trimmed, at most `limit` chars.
#[must_use]
pub fn bounded_prefix(text: &str, limit: usize) -> String {
    text.trim().chars().take(limit).collect()
}

fn fallback_record(source: &StageName, raw: &str) -> ErrorRecord {
    ErrorRecord::new(
        source.clone(),
        PARSE_ERROR_TYPE,
        bounded_prefix(raw, DESCRIPTION_PREFIX_LIMIT),
        FALLBACK_SUGGESTION,
    )
}

/// Locates the first balanced `{...}` or `[...]` substring, honoring string
/// literals and escapes so braces inside quoted text do not end the scan.
fn balanced_fragment(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Interprets a parsed JSON value as a record batch. `None` means the value
/// has no recognizable record shape and the fallback path should run.
fn records_from_value(source: &StageName, value: &Value) -> Option<Vec<ErrorRecord>> {
    match value {
        Value::Array(entries) => Some(
            entries
                .iter()
                .filter_map(Value::as_object)
                .map(|entry| record_from_entry(source, entry, None))
                .collect(),
        ),
        Value::Object(obj) => {
            if let Some(Value::Array(entries)) = obj.get("errors") {
                let outer_type = obj.get("error_type").and_then(Value::as_str);
                return Some(
                    entries
                        .iter()
                        .filter_map(Value::as_object)
                        .map(|entry| record_from_entry(source, entry, outer_type))
                        .collect(),
                );
            }
            let looks_like_record = ["error_type", "description", "suggestion"]
                .iter()
                .any(|key| obj.contains_key(*key));
            looks_like_record.then(|| vec![record_from_entry(source, obj, None)])
        }
        _ => None,
    }
}

fn record_from_entry(
    source: &StageName,
    entry: &serde_json::Map<String, Value>,
    outer_type: Option<&str>,
) -> ErrorRecord {
    let error_type = field_string(entry, "error_type")
        .or_else(|| outer_type.map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_ERROR_TYPE.to_string());
    let description =
        field_string(entry, "description").unwrap_or_else(|| NO_DESCRIPTION.to_string());
    let suggestion = field_string(entry, "suggestion").unwrap_or_else(|| NO_SUGGESTION.to_string());

    let mut record = ErrorRecord::new(source.clone(), error_type, description, suggestion);
    record.element = field_string(entry, "element_id").or_else(|| field_string(entry, "element"));
    record
}

/// String view of a field, tolerating non-string scalars (numbers, booleans)
/// that some backends emit in place of strings.
fn field_string(entry: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other if other.is_array() || other.is_object() => None,
        other => Some(other.to_string()),
    }
}
