//! Normalization of AI-enhancement responses into the canonical format.
//!
//! Three input shapes are accepted: a canonical `{sections: [...]}` object,
//! a legacy `{blocks: [...]}` object, and a `{raw_content: "..."}` wrapper
//! whose string may embed JSON either in a fenced ```json block or as a
//! bare `{...}` span. Normalization is total and idempotent: it never
//! fails, and running it twice is the same as running it once. When the
//! embedded JSON cannot be parsed the original input is returned unchanged
//! so downstream renderers can fall back to a raw display.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::schema::{CanonicalTarget, Document, LegacyBlock, legacy_target, string_array};

/// Outcome of layering the typed model over a normalized value.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Document(Document),
    /// The input could not be shaped into a document; the value is kept
    /// as-is for raw display.
    Raw(Value),
}

/// Convert any accepted input shape into a canonical wire value.
pub fn normalize(input: Value) -> Value {
    if let Some(raw) = input.get("raw_content").and_then(Value::as_str) {
        return match extract_embedded_json(raw) {
            Some(parsed) => normalize(parsed),
            None => input,
        };
    }

    let Value::Object(mut obj) = input else {
        return input;
    };

    if !obj.contains_key("sections")
        && let Some(blocks) = obj.remove("blocks")
    {
        let sections = match blocks {
            Value::Array(blocks) => blocks.into_iter().map(normalize_block).collect(),
            _ => Vec::new(),
        };
        obj.insert("sections".to_string(), Value::Array(sections));
        return Value::Object(obj);
    }

    obj.entry("sections")
        .or_insert_with(|| Value::Array(Vec::new()));
    Value::Object(obj)
}

/// Normalize and lift into the typed [`Document`] model.
pub fn normalize_document(input: Value) -> Normalized {
    let value = normalize(input);
    if value.get("sections").is_some_and(Value::is_array)
        && let Ok(doc) = serde_json::from_value::<Document>(value.clone())
    {
        return Normalized::Document(doc);
    }
    Normalized::Raw(value)
}

/// Translate one legacy block through the schema mapping table.
///
/// Values that do not deserialize as a legacy block (no `type`, not an
/// object) pass through unchanged rather than being dropped.
fn normalize_block(block: Value) -> Value {
    let Ok(legacy) = serde_json::from_value::<LegacyBlock>(block.clone()) else {
        return block;
    };
    let text = legacy.text.clone().unwrap_or_default();

    match legacy_target(&legacy.kind) {
        CanonicalTarget::Heading { level } => {
            json!({ "type": "heading", "level": level, "content": text })
        }
        CanonicalTarget::List { style } => {
            let mut items = string_array(legacy.items.as_ref());
            if items.is_empty() && !text.is_empty() {
                items = vec![text];
            }
            json!({ "type": "list", "style": style.as_str(), "items": items })
        }
        CanonicalTarget::ConceptBlock => {
            let mut map = Map::new();
            map.insert("type".to_string(), json!("concept_block"));
            let term = match legacy.extra.get("term").and_then(Value::as_str) {
                Some(term) => term.to_string(),
                None => text,
            };
            map.insert("term".to_string(), json!(term));
            if let Some(definition) = legacy.extra.get("definition") {
                map.insert("definition".to_string(), definition.clone());
            }
            let examples = string_array(legacy.extra.get("examples"));
            if !examples.is_empty() {
                map.insert("examples".to_string(), json!(examples));
            }
            Value::Object(map)
        }
        CanonicalTarget::SummaryBlock => {
            json!({ "type": "summary_block", "content": text })
        }
        CanonicalTarget::KeyConceptsBlock => {
            let mut concepts = string_array(legacy.extra.get("concepts"));
            if concepts.is_empty() {
                concepts = string_array(legacy.items.as_ref());
            }
            if concepts.is_empty() && !text.is_empty() {
                concepts = vec![text];
            }
            json!({ "type": "key_concepts_block", "concepts": concepts })
        }
        CanonicalTarget::PassThrough => {
            // Keep the original type string and any type-specific fields
            // (e.g. a formula's description); `text` becomes `content`.
            let mut map = legacy.extra.clone();
            map.insert("type".to_string(), json!(legacy.kind));
            if !map.contains_key("content") {
                map.insert("content".to_string(), json!(text));
            }
            Value::Object(map)
        }
    }
}

static FENCED_JSON: OnceLock<Regex> = OnceLock::new();

fn fenced_json_regex() -> &'static Regex {
    FENCED_JSON.get_or_init(|| {
        Regex::new(r"(?s)```json\s*(.*?)```").expect("Invalid fenced JSON regex")
    })
}

/// Locate embedded JSON in free text: a fenced ```json block wins, else the
/// first brace-balanced `{...}` span.
fn extract_embedded_json(raw: &str) -> Option<Value> {
    if let Some(caps) = fenced_json_regex().captures(raw)
        && let Ok(value) = serde_json::from_str::<Value>(caps[1].trim())
    {
        return Some(value);
    }
    first_balanced_object(raw).and_then(|span| serde_json::from_str(span).ok())
}

/// First `{...}` span with balanced braces, skipping braces inside JSON
/// string literals.
pub(crate) fn first_balanced_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (ix, byte) in raw.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=ix]);
                }
            }
            _ => {}
        }
    }
    None
}
