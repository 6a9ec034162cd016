//! Extracting a JSON object from model output.
//!
//! Models wrap JSON in markdown fences or chatter around it even when asked
//! not to, so the text is trimmed down to the outermost object first.

use serde_json::{Map, Value};

use super::GeminiError;

/// Strip markdown fences and surrounding prose from a model reply.
///
/// Empty input becomes `{}`. When the text holds an object, everything
/// outside the first `{` and last `}` is dropped.
#[must_use]
pub fn clean_json_response(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return "{}".to_string();
    }

    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text).trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => {
            text.get(start..=end).unwrap_or(text).to_string()
        }
        _ => text.to_string(),
    }
}

/// Parse cleaned model output into a non-empty JSON object.
///
/// # Errors
///
/// Returns `GeminiError::Validation` if the text isn't JSON, isn't an
/// object, or is an empty object.
pub fn parse_object(text: &str) -> Result<Map<String, Value>, GeminiError> {
    let cleaned = clean_json_response(text);
    let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
        tracing::debug!(snippet = %cleaned.chars().take(500).collect::<String>(), "Unparseable AI reply");
        GeminiError::Validation(e.to_string())
    })?;

    match value {
        Value::Object(map) if map.is_empty() => {
            Err(GeminiError::Validation("empty object".to_string()))
        }
        Value::Object(map) => Ok(map),
        other => Err(GeminiError::Validation(format!(
            "expected an object, got {}",
            type_name(&other)
        ))),
    }
}

/// Keys from `required` that `data` lacks.
#[must_use]
pub fn missing_fields<'a>(data: &Map<String, Value>, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|key| !data.contains_key(*key))
        .collect()
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
