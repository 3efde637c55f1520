//! Edit session state machine.
//!
//! A session edits either the whole document (`Full` scope) or one detached
//! section in isolation (`Single` scope). Sections are held in a
//! [`SectionArena`]: an ordered list of stable IDs over an ID-keyed map.
//! Positional paths are resolved to an ID once, when `Single` scope is
//! entered, so a save can never land on the wrong section after the list
//! has been reordered.
//!
//! Saving is local-first: the in-memory document is committed before the
//! persistence collaborator is called, and a store failure surfaces as a
//! warning without rolling the edit back.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::normalize::normalize;
use crate::path;

/// Stable identity of one section for the lifetime of a session. Never
/// serialized; the wire format stays purely positional.
pub type SectionId = Uuid;

/// Ordered ID list over an ID-keyed section map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionArena {
    order: Vec<SectionId>,
    nodes: HashMap<SectionId, Value>,
}

impl SectionArena {
    fn from_sections(sections: Vec<Value>) -> Self {
        let mut arena = SectionArena::default();
        for section in sections {
            arena.push(section);
        }
        arena
    }

    fn push(&mut self, section: Value) -> SectionId {
        let id = Uuid::new_v4();
        self.order.push(id);
        self.nodes.insert(id, section);
        id
    }

    fn to_sections(&self) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn id_at(&self, index: usize) -> Option<SectionId> {
        self.order.get(index).copied()
    }

    pub fn get(&self, id: &SectionId) -> Option<&Value> {
        self.nodes.get(id)
    }

    fn set(&mut self, id: SectionId, section: Value) -> bool {
        if self.nodes.contains_key(&id) {
            self.nodes.insert(id, section);
            true
        } else {
            false
        }
    }

    fn insert_at(&mut self, position: i64, section: Value) -> SectionId {
        let id = Uuid::new_v4();
        let len = self.order.len() as i64;
        let ix = if (0..=len).contains(&position) {
            position as usize
        } else {
            self.order.len()
        };
        self.order.insert(ix, id);
        self.nodes.insert(id, section);
        id
    }

    fn remove_at(&mut self, index: usize) -> Option<Value> {
        if index >= self.order.len() {
            return None;
        }
        let id = self.order.remove(index);
        self.nodes.remove(&id)
    }

    fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.order.len() || to >= self.order.len() {
            return false;
        }
        let id = self.order.remove(from);
        self.order.insert(to, id);
        true
    }
}

/// Editing scope of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    /// Editing the whole document.
    Full,
    /// Editing one detached section, identified by its stable ID.
    Single { id: SectionId, draft: Value },
}

/// Payload handed to the persistence collaborator on every save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// The full document, serialized to a JSON string.
    pub enhanced_text: String,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected the note: {0}")]
    Rejected(String),
}

/// Persistence collaborator. Consumed, never implemented here.
pub trait NoteStore {
    fn save(&self, payload: &SavePayload) -> Result<(), PersistError>;
}

/// Result of a save. `persisted == false` means the edit was kept locally
/// and the warning should be shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub persisted: bool,
    pub warning: Option<String>,
}

/// Editor-local state for one document.
pub struct EditSession {
    /// Top-level document fields other than `sections`.
    meta: Map<String, Value>,
    arena: SectionArena,
    scope: Scope,
}

impl EditSession {
    /// Start a session from any accepted input shape (the input is
    /// normalized first).
    pub fn new(input: Value) -> Self {
        let mut meta = match normalize(input) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let sections = match meta.remove("sections") {
            Some(Value::Array(sections)) => sections,
            _ => Vec::new(),
        };
        Self {
            meta,
            arena: SectionArena::from_sections(sections),
            scope: Scope::Full,
        }
    }

    /// Reassemble the full document in its canonical wire form.
    pub fn document(&self) -> Value {
        let mut map = self.meta.clone();
        map.insert(
            "sections".to_string(),
            Value::Array(self.arena.to_sections()),
        );
        Value::Object(map)
    }

    pub fn title(&self) -> Option<String> {
        self.meta
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn summary(&self) -> Option<String> {
        self.meta
            .get("summary")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn arena(&self) -> &SectionArena {
        &self.arena
    }

    /// Set the editing target.
    ///
    /// A target path plus an already-detached element enters `Single`
    /// scope; the element is captured as-is, never re-resolved from the
    /// current document. No target returns to `Full`. Returns `false` when
    /// the path does not name an existing section (the session stays in
    /// `Full`).
    pub fn set_target(&mut self, target: Option<(&str, Value)>) -> bool {
        match target {
            None => {
                self.scope = Scope::Full;
                true
            }
            Some((target_path, detached)) => match self.section_id_for(target_path) {
                Some(id) => {
                    self.scope = Scope::Single { id, draft: detached };
                    true
                }
                None => {
                    self.scope = Scope::Full;
                    false
                }
            },
        }
    }

    fn section_id_for(&self, target_path: &str) -> Option<SectionId> {
        let mut parts = target_path.split('.');
        if parts.next() != Some("sections") {
            return None;
        }
        let index: usize = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        self.arena.id_at(index)
    }

    /// Read a value at a path within the current scope's root.
    pub fn read(&self, at: &str) -> Option<Value> {
        match &self.scope {
            Scope::Single { draft, .. } => path::read(draft, at).cloned(),
            Scope::Full => path::read(&self.document(), at).cloned(),
        }
    }

    /// Set the value at a path within the current scope's root.
    pub fn write(&mut self, at: &str, value: Value) {
        if let Scope::Single { id, draft } = &self.scope {
            self.scope = Scope::Single {
                id: *id,
                draft: path::write(draft, at, value),
            };
            return;
        }
        match split_section_path(at) {
            Some((None, _)) => {
                if let Value::Array(sections) = value {
                    self.arena = SectionArena::from_sections(sections);
                }
            }
            Some((Some(index), rest)) => match self.arena.id_at(index) {
                Some(id) => {
                    let node = match (rest, self.arena.get(&id)) {
                        (None, _) => value,
                        (Some(rest), Some(node)) => path::write(node, rest, value),
                        (Some(rest), None) => path::write(&Value::Null, rest, value),
                    };
                    self.arena.set(id, node);
                }
                None => {
                    // Writing past the end appends, mirroring the path
                    // engine's container-extension rule.
                    let node = match rest {
                        Some(rest) => path::write(&Value::Null, rest, value),
                        None => value,
                    };
                    self.arena.insert_at(self.arena.len() as i64, node);
                }
            },
            None => {
                let meta = path::write(&Value::Object(self.meta.clone()), at, value);
                if let Value::Object(map) = meta {
                    self.meta = map;
                }
            }
        }
    }

    /// Insert into the array at a collection path within the current scope.
    pub fn insert(&mut self, collection_path: &str, value: Value, position: i64) {
        if let Scope::Single { id, draft } = &self.scope {
            self.scope = Scope::Single {
                id: *id,
                draft: path::insert(draft, collection_path, value, position),
            };
            return;
        }
        match split_section_path(collection_path) {
            Some((None, _)) => {
                self.arena.insert_at(position, value);
            }
            Some((Some(index), rest)) => {
                // A bare section is an object, not a collection; only
                // paths inside it can take an insert.
                if let Some(rest) = rest
                    && let Some(id) = self.arena.id_at(index)
                    && let Some(node) = self.arena.get(&id)
                {
                    let node = path::insert(node, rest, value, position);
                    self.arena.set(id, node);
                }
            }
            None => {
                let meta = path::insert(
                    &Value::Object(self.meta.clone()),
                    collection_path,
                    value,
                    position,
                );
                if let Value::Object(map) = meta {
                    self.meta = map;
                }
            }
        }
    }

    /// Delete the value at a path within the current scope.
    pub fn delete(&mut self, at: &str) {
        if let Scope::Single { id, draft } = &self.scope {
            self.scope = Scope::Single {
                id: *id,
                draft: path::delete(draft, at),
            };
            return;
        }
        match split_section_path(at) {
            Some((Some(index), None)) => {
                self.arena.remove_at(index);
            }
            Some((Some(index), Some(rest))) => {
                if let Some(id) = self.arena.id_at(index)
                    && let Some(node) = self.arena.get(&id)
                {
                    let node = path::delete(node, rest);
                    self.arena.set(id, node);
                }
            }
            Some((None, _)) => {
                self.arena = SectionArena::default();
            }
            None => {
                let meta = path::delete(&Value::Object(self.meta.clone()), at);
                if let Value::Object(map) = meta {
                    self.meta = map;
                }
            }
        }
    }

    /// Move a section to a new position. Single-scope targets keep
    /// following their section because they hold its ID, not its index.
    pub fn move_section(&mut self, from: usize, to: usize) -> bool {
        self.arena.reorder(from, to)
    }

    /// Commit the current scope's edits and hand the serialized document to
    /// the persistence collaborator.
    ///
    /// In `Single` scope the draft overwrites the stored section, except
    /// when the draft carries a `generated_content` object: that object is
    /// shallow-merged over the stored section so fields generation did not
    /// produce (such as `type`) are preserved. Store failure never rolls
    /// back the in-memory edit.
    pub fn save(&mut self, store: &dyn NoteStore) -> SaveReport {
        if let Scope::Single { id, draft } = &self.scope {
            let id = *id;
            let committed = match draft.get("generated_content") {
                Some(Value::Object(generated)) => {
                    let mut base = match self.arena.get(&id) {
                        Some(Value::Object(existing)) => existing.clone(),
                        _ => Map::new(),
                    };
                    for (key, value) in generated {
                        base.insert(key.clone(), value.clone());
                    }
                    Value::Object(base)
                }
                _ => draft.clone(),
            };
            self.arena.set(id, committed.clone());
            self.scope = Scope::Single {
                id,
                draft: committed,
            };
        }

        let payload = SavePayload {
            title: self.title(),
            summary: self.summary(),
            enhanced_text: self.document().to_string(),
        };
        match store.save(&payload) {
            Ok(()) => SaveReport {
                persisted: true,
                warning: None,
            },
            Err(err) => SaveReport {
                persisted: false,
                warning: Some(format!("edits kept locally, persistence failed: {err}")),
            },
        }
    }
}

/// Split a path that addresses into the section list.
///
/// Returns `None` for paths outside `sections`, `Some((None, None))` for
/// the list itself, and `Some((Some(index), rest))` for a section or a
/// location inside one.
fn split_section_path(at: &str) -> Option<(Option<usize>, Option<&str>)> {
    let rest = if at == "sections" {
        return Some((None, None));
    } else {
        at.strip_prefix("sections.")?
    };
    match rest.split_once('.') {
        Some((index, tail)) => Some((Some(index.parse().ok()?), Some(tail))),
        None => Some((Some(rest.parse().ok()?), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;

    struct RecordingStore {
        saved: RefCell<Vec<SavePayload>>,
        fail: bool,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                saved: RefCell::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                saved: RefCell::new(Vec::new()),
                fail: true,
            }
        }
    }

    impl NoteStore for RecordingStore {
        fn save(&self, payload: &SavePayload) -> Result<(), PersistError> {
            if self.fail {
                return Err(PersistError::Unavailable("offline".to_string()));
            }
            self.saved.borrow_mut().push(payload.clone());
            Ok(())
        }
    }

    fn session() -> EditSession {
        EditSession::new(json!({
            "title": "Mitosis",
            "summary": "División celular",
            "sections": [
                { "type": "heading", "level": 1, "content": "Fases" },
                { "type": "paragraph", "content": "Profase..." },
                { "type": "concept_block", "term": "Centrómero" }
            ]
        }))
    }

    #[test]
    fn test_new_session_normalizes_legacy_input() {
        let session = EditSession::new(json!({ "blocks": [{ "type": "h1", "text": "T" }] }));
        assert_eq!(
            session.document()["sections"],
            json!([{ "type": "heading", "level": 1, "content": "T" }])
        );
    }

    #[test]
    fn test_target_with_detached_element_enters_single_scope() {
        let mut session = session();
        let detached = json!({ "type": "paragraph", "content": "edited elsewhere" });
        assert!(session.set_target(Some(("sections.1", detached.clone()))));
        match session.scope() {
            Scope::Single { draft, .. } => assert_eq!(draft, &detached),
            Scope::Full => panic!("expected single scope"),
        }
    }

    #[test]
    fn test_no_target_returns_to_full_scope() {
        let mut session = session();
        session.set_target(Some(("sections.0", json!({ "type": "paragraph" }))));
        session.set_target(None);
        assert_eq!(session.scope(), &Scope::Full);
    }

    #[test]
    fn test_target_outside_sections_is_rejected() {
        let mut session = session();
        assert!(!session.set_target(Some(("title", json!("x")))));
        assert!(!session.set_target(Some(("sections.9", json!({})))));
        assert_eq!(session.scope(), &Scope::Full);
    }

    #[test]
    fn test_single_save_overwrites_the_original_section() {
        let mut session = session();
        let edited = json!({ "type": "paragraph", "content": "Profase, ampliada" });
        session.set_target(Some(("sections.1", edited.clone())));
        let store = RecordingStore::new();
        let report = session.save(&store);
        assert!(report.persisted);
        assert_eq!(session.document()["sections"][1], edited);
    }

    #[test]
    fn test_generated_content_is_shallow_merged_over_the_section() {
        let mut session = session();
        session.set_target(Some((
            "sections.2",
            json!({ "generated_content": { "definition": "región del cromosoma" } }),
        )));
        session.save(&RecordingStore::new());
        assert_eq!(
            session.document()["sections"][2],
            json!({
                "type": "concept_block",
                "term": "Centrómero",
                "definition": "región del cromosoma"
            })
        );
    }

    #[test]
    fn test_single_save_survives_concurrent_reorder() {
        let mut session = session();
        let edited = json!({ "type": "paragraph", "content": "moved but found" });
        session.set_target(Some(("sections.1", edited.clone())));
        // Reorder under the session's feet: the paragraph moves to index 0.
        assert!(session.move_section(1, 0));
        session.save(&RecordingStore::new());
        assert_eq!(session.document()["sections"][0], edited);
        assert_eq!(
            session.document()["sections"][1]["content"],
            json!("Fases")
        );
    }

    #[test]
    fn test_persistence_failure_keeps_the_local_edit() {
        let mut session = session();
        session.write("title", json!("Mitosis II"));
        let report = session.save(&RecordingStore::failing());
        assert!(!report.persisted);
        assert!(report.warning.is_some());
        assert_eq!(session.title(), Some("Mitosis II".to_string()));
    }

    #[test]
    fn test_save_serializes_the_full_document() {
        let mut session = session();
        let store = RecordingStore::new();
        session.save(&store);
        let saved = store.saved.borrow();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].title, Some("Mitosis".to_string()));
        assert_eq!(saved[0].summary, Some("División celular".to_string()));
        let roundtrip: Value = serde_json::from_str(&saved[0].enhanced_text).unwrap();
        assert_eq!(roundtrip, session.document());
    }

    #[test]
    fn test_full_scope_writes_address_the_document() {
        let mut session = session();
        session.write("sections.1.content", json!("Profase y metafase"));
        session.write("title", json!("Mitosis y meiosis"));
        assert_eq!(
            session.read("sections.1.content"),
            Some(json!("Profase y metafase"))
        );
        assert_eq!(session.title(), Some("Mitosis y meiosis".to_string()));
    }

    #[test]
    fn test_full_scope_insert_and_delete() {
        let mut session = session();
        session.insert("sections", json!({ "type": "quote", "content": "q" }), 1);
        assert_eq!(session.document()["sections"][1]["type"], json!("quote"));
        assert_eq!(session.arena().len(), 4);
        session.delete("sections.1");
        assert_eq!(session.arena().len(), 3);
        assert_eq!(
            session.document()["sections"][1]["content"],
            json!("Profase...")
        );
    }

    #[test]
    fn test_single_scope_edits_address_the_detached_section() {
        let mut session = session();
        session.set_target(Some((
            "sections.2",
            json!({ "type": "concept_block", "term": "Centrómero" }),
        )));
        session.write("definition", json!("unión de cromátidas"));
        assert_eq!(
            session.read("definition"),
            Some(json!("unión de cromátidas"))
        );
        // The full document is untouched until save.
        assert_eq!(
            session.document()["sections"][2],
            json!({ "type": "concept_block", "term": "Centrómero" })
        );
    }
}
