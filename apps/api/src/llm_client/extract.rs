//! Reply extraction — pulls the generated text out of whichever body shape the provider used.
//!
//! Shapes are tried in a fixed order and the first non-empty text wins:
//! 1. `output_text` — flat string field
//! 2. `output`      — list of items; the first assistant `message` carries content blocks
//! 3. `choices`     — chat-completion `choices[0].message.content`
//!
//! Nothing matched → the whole body, compactly serialized. The caller never gets "".

use serde_json::Value;

use super::LlmError;

type Extractor = fn(&Value) -> Option<String>;

/// Ordered (shape name, extractor) table. Order is priority.
const SHAPES: &[(&str, Extractor)] = &[
    ("output_text", from_output_text),
    ("output", from_output_items),
    ("choices", from_choices),
];

/// Which rule produced the reply. Logged for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Shape(&'static str),
    RawJson,
    RawText,
}

/// Extracts the assistant reply from a raw provider body.
pub fn extract_reply(body: &str) -> Result<(String, ReplySource), LlmError> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok(extract_from_value(&value)),
        Err(_) if !body.trim().is_empty() => Ok((body.trim().to_string(), ReplySource::RawText)),
        Err(_) => Err(LlmError::EmptyContent),
    }
}

pub fn extract_from_value(value: &Value) -> (String, ReplySource) {
    SHAPES
        .iter()
        .find_map(|(name, extractor)| {
            extractor(value)
                .filter(|text| !text.trim().is_empty())
                .map(|text| (text, ReplySource::Shape(*name)))
        })
        .unwrap_or_else(|| (value.to_string(), ReplySource::RawJson))
}

fn from_output_text(value: &Value) -> Option<String> {
    value.get("output_text")?.as_str().map(str::to_string)
}

fn from_output_items(value: &Value) -> Option<String> {
    let message = value.get("output")?.as_array()?.iter().find(|item| {
        item.get("type").and_then(Value::as_str) == Some("message")
            && item.get("role").and_then(Value::as_str) == Some("assistant")
    })?;

    match message.get("content")? {
        Value::Array(blocks) => blocks
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("output_text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .find(|text| !text.is_empty())
            .map(str::to_string),
        Value::String(text) => Some(text.clone()),
        _ => None,
    }
}

fn from_choices(value: &Value) -> Option<String> {
    value
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}
