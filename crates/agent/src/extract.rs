//! Structured-output extraction from free model text.
//!
//! Model output is untrusted. Extraction tries a ```` ```json ```` fenced
//! block, then any ```` ``` ```` fenced block, then the raw text; the first
//! candidate that deserializes into the target type wins. When none does the
//! caller's fallback value is used, so the payload shape never depends on
//! what the model produced.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Either a value parsed from model output or the declared fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredOutput<T> {
    Structured(T),
    Fallback(T),
}

impl<T> StructuredOutput<T> {
    pub fn is_structured(&self) -> bool {
        matches!(self, StructuredOutput::Structured(_))
    }

    pub fn get(&self) -> &T {
        match self {
            StructuredOutput::Structured(value) | StructuredOutput::Fallback(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            StructuredOutput::Structured(value) | StructuredOutput::Fallback(value) => value,
        }
    }
}

/// Parse `text` into `T`, or fall back.
pub fn parse_structured<T, F>(text: &str, fallback: F) -> StructuredOutput<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    for candidate in candidates(text) {
        if let Ok(value) = serde_json::from_str::<T>(candidate) {
            return StructuredOutput::Structured(value);
        }
    }
    StructuredOutput::Fallback(fallback())
}

/// Candidate blocks in priority order.
fn candidates(text: &str) -> Vec<&str> {
    let mut out = Vec::with_capacity(3);
    if let Some(block) = fenced(text, "```json") {
        out.push(block);
    }
    if let Some(block) = fenced(text, "```") {
        out.push(block);
    }
    out.push(text.trim());
    out
}

/// Content between `opener` and the next closing fence.
///
/// For a generic fence the optional language tag on the opening line is skipped.
fn fenced<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    let rest = if opener == "```" {
        match rest.find('\n') {
            Some(newline) if !rest[..newline].trim().contains(char::is_whitespace) => &rest[newline..],
            _ => rest,
        }
    } else {
        rest
    };
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// Deserializers that accept whatever JSON shape a model chose and coerce it
/// to the field type, so a stringly list or a numeric score does not sink an
/// otherwise usable response.
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::render;

    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(render(&value))
    }

    pub fn list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Array(items) => items
                .iter()
                .map(render)
                .filter(|s| !s.is_empty())
                .collect(),
            Value::Null => Vec::new(),
            other => {
                let single = render(&other);
                if single.is_empty() { Vec::new() } else { vec![single] }
            }
        })
    }
}

/// Flatten a JSON value into display text.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join("; "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", render(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// First `max` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
