//! Canonical block schema for structured notes.
//!
//! A note is a [`Document`] made of typed [`Section`]s. Two wire formats
//! reach us from the AI enhancement step: the canonical `sections` shape
//! modelled here, and an older `blocks` shape ([`LegacyBlock`]) that is
//! translated through the total mapping in [`legacy_target`].
//!
//! `Section` is a closed sum type so that every consumer matches on it
//! exhaustively; section types we do not recognise are still legal wire
//! values and are carried opaquely in [`Section::Other`] so they can be
//! re-serialized and rendered as a raw fallback instead of being dropped.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// The canonical structured note.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_concepts: Option<Vec<String>>,
}

/// List marker style, shared by the legacy and canonical formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStyle {
    Bulleted,
    Numbered,
}

impl ListStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListStyle::Bulleted => "bulleted",
            ListStyle::Numbered => "numbered",
        }
    }
}

/// One typed content node within a [`Document`].
///
/// The wire form is internally tagged on `"type"`. Deserialization never
/// fails on an unknown tag; the raw value lands in [`Section::Other`].
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Heading {
        level: u8,
        content: String,
    },
    Paragraph {
        content: String,
    },
    List {
        style: ListStyle,
        items: Vec<String>,
    },
    ConceptBlock {
        term: String,
        definition: Option<String>,
        examples: Vec<String>,
    },
    SummaryBlock {
        content: String,
    },
    KeyConceptsBlock {
        concepts: Vec<String>,
    },
    Quote {
        content: String,
    },
    Code {
        content: String,
    },
    Formula {
        content: String,
        description: Option<String>,
    },
    Example {
        content: String,
    },
    ImportantNote {
        content: String,
    },
    /// Unrecognised section type, carried verbatim for pass-through
    /// rendering.
    Other(Value),
}

impl Section {
    /// Build a section from a wire value. Total: anything that does not
    /// look like a known section type becomes [`Section::Other`].
    pub fn from_value(value: Value) -> Section {
        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return Section::Other(value);
        };
        match kind {
            "heading" => Section::Heading {
                level: heading_level(value.get("level")),
                content: string_field(&value, "content"),
            },
            "paragraph" => Section::Paragraph {
                content: string_field(&value, "content"),
            },
            "list" => Section::List {
                style: list_style(value.get("style")),
                items: string_array(value.get("items")),
            },
            "concept_block" => Section::ConceptBlock {
                term: string_field(&value, "term"),
                definition: opt_string_field(&value, "definition"),
                examples: string_array(value.get("examples")),
            },
            "summary_block" => Section::SummaryBlock {
                content: string_field(&value, "content"),
            },
            "key_concepts_block" => Section::KeyConceptsBlock {
                concepts: string_array(value.get("concepts")),
            },
            "quote" => Section::Quote {
                content: string_field(&value, "content"),
            },
            "code" => Section::Code {
                content: string_field(&value, "content"),
            },
            "formula" => Section::Formula {
                content: string_field(&value, "content"),
                description: opt_string_field(&value, "description"),
            },
            "example" => Section::Example {
                content: string_field(&value, "content"),
            },
            "important_note" => Section::ImportantNote {
                content: string_field(&value, "content"),
            },
            _ => Section::Other(value),
        }
    }

    /// Wire representation of this section.
    pub fn to_value(&self) -> Value {
        match self {
            Section::Heading { level, content } => {
                json!({ "type": "heading", "level": level, "content": content })
            }
            Section::Paragraph { content } => {
                json!({ "type": "paragraph", "content": content })
            }
            Section::List { style, items } => {
                json!({ "type": "list", "style": style.as_str(), "items": items })
            }
            Section::ConceptBlock {
                term,
                definition,
                examples,
            } => {
                let mut map = Map::new();
                map.insert("type".into(), json!("concept_block"));
                map.insert("term".into(), json!(term));
                if let Some(definition) = definition {
                    map.insert("definition".into(), json!(definition));
                }
                if !examples.is_empty() {
                    map.insert("examples".into(), json!(examples));
                }
                Value::Object(map)
            }
            Section::SummaryBlock { content } => {
                json!({ "type": "summary_block", "content": content })
            }
            Section::KeyConceptsBlock { concepts } => {
                json!({ "type": "key_concepts_block", "concepts": concepts })
            }
            Section::Quote { content } => json!({ "type": "quote", "content": content }),
            Section::Code { content } => json!({ "type": "code", "content": content }),
            Section::Formula {
                content,
                description,
            } => {
                let mut map = Map::new();
                map.insert("type".into(), json!("formula"));
                map.insert("content".into(), json!(content));
                if let Some(description) = description {
                    map.insert("description".into(), json!(description));
                }
                Value::Object(map)
            }
            Section::Example { content } => json!({ "type": "example", "content": content }),
            Section::ImportantNote { content } => {
                json!({ "type": "important_note", "content": content })
            }
            Section::Other(value) => value.clone(),
        }
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Section::from_value(Value::deserialize(deserializer)?))
    }
}

fn string_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn opt_string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

/// A lone string is lifted into a one-element array; non-string entries
/// keep their compact JSON rendering rather than being dropped.
pub(crate) fn string_array(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| match entry {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn heading_level(value: Option<&Value>) -> u8 {
    match value.and_then(Value::as_u64) {
        Some(level @ 1..=3) => level as u8,
        _ => 2,
    }
}

fn list_style(value: Option<&Value>) -> ListStyle {
    match value.and_then(Value::as_str) {
        Some("numbered") => ListStyle::Numbered,
        _ => ListStyle::Bulleted,
    }
}

/// Alternate wire format produced by the transcription enhancement step.
///
/// Everything except `type` is optional; fields this struct does not model
/// (e.g. `term`, `definition`, `concepts`) are kept in `extra` so that
/// type-specific data survives the translation to canonical sections.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub items: Option<Value>,
    #[serde(default)]
    pub time: Option<Value>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical destination of one legacy block type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalTarget {
    Heading { level: u8 },
    List { style: ListStyle },
    ConceptBlock,
    SummaryBlock,
    KeyConceptsBlock,
    /// The block keeps its original `type` string, with `text` renamed to
    /// `content`.
    PassThrough,
}

/// Legacy → canonical mapping table.
///
/// Total by construction: every string has a defined target. Heading types
/// outside h1/h2/h3 fall back to level 2.
pub fn legacy_target(kind: &str) -> CanonicalTarget {
    match kind {
        "h1" => CanonicalTarget::Heading { level: 1 },
        "h2" => CanonicalTarget::Heading { level: 2 },
        "h3" => CanonicalTarget::Heading { level: 3 },
        "bulleted_list" => CanonicalTarget::List {
            style: ListStyle::Bulleted,
        },
        "numbered_list" => CanonicalTarget::List {
            style: ListStyle::Numbered,
        },
        "concept_block" => CanonicalTarget::ConceptBlock,
        "summary_block" => CanonicalTarget::SummaryBlock,
        "key_concepts_block" => CanonicalTarget::KeyConceptsBlock,
        other if other.len() == 2 && other.starts_with('h') => {
            CanonicalTarget::Heading { level: 2 }
        }
        _ => CanonicalTarget::PassThrough,
    }
}
