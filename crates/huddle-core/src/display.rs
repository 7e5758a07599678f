//! Turn a resolved value into text for a text block.

use serde_json::Value;

/// Shown when a reference resolved to nothing usable.
pub const UNRESOLVED_MARKER: &str = "[Error: unable to resolve]";

/// Prefix for each line of a rendered sequence.
pub const BULLET: &str = "• ";

/// Render `value` for display.
///
/// Null, an empty sequence and an empty mapping all render as
/// [`UNRESOLVED_MARKER`]; an empty result is a failed resolution as far as
/// the reader is concerned.
#[must_use]
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => UNRESOLVED_MARKER.to_string(),
        Value::Array(items) if items.is_empty() => UNRESOLVED_MARKER.to_string(),
        Value::Object(entries) if entries.is_empty() => UNRESOLVED_MARKER.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| format!("{BULLET}{}", element_text(item)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| UNRESOLVED_MARKER.to_string())
        }
        Value::String(text) => text.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
    }
}

/// One bullet's text. Item records show their content.
fn element_text(item: &Value) -> String {
    match item {
        Value::String(text) => text.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Object(fields) => match fields.get("content") {
            Some(content) => element_text(content),
            None => item.to_string(),
        },
        Value::Array(_) => item.to_string(),
    }
}
