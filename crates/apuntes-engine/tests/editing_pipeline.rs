//! End-to-end flow: AI response in, edits, save payload and export HTML out.

use std::cell::RefCell;

use apuntes_engine::{
    EditSession, NoteStore, PersistError, RenderOptions, SavePayload, document_to_text,
    normalize_document, render_export_html, render_markup,
};
use apuntes_engine::{Document, Normalized};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

struct MemoryStore {
    saved: RefCell<Vec<SavePayload>>,
}

impl MemoryStore {
    fn new() -> Self {
        Self {
            saved: RefCell::new(Vec::new()),
        }
    }
}

impl NoteStore for MemoryStore {
    fn save(&self, payload: &SavePayload) -> Result<(), PersistError> {
        self.saved.borrow_mut().push(payload.clone());
        Ok(())
    }
}

fn enhancement_response() -> Value {
    json!({
        "raw_content": "Resultado:\n```json\n{\n  \"title\": \"La célula\",\n  \"summary\": \"Unidad básica de la vida\",\n  \"blocks\": [\n    { \"type\": \"h1\", \"text\": \"Estructura celular\", \"time\": 3.2 },\n    { \"type\": \"paragraph\", \"text\": \"Toda célula tiene membrana.\", \"speaker\": \"S1\" },\n    { \"type\": \"concept_block\", \"text\": \"Mitocondria\", \"definition\": \"orgánulo energético\", \"examples\": [\"célula muscular\"] },\n    { \"type\": \"bulleted_list\", \"items\": [\"membrana\", \"citoplasma\", \"núcleo\"] },\n    { \"type\": \"key_concepts_block\", \"concepts\": [\"ATP\", \"ADN\"] }\n  ]\n}\n```"
    })
}

#[test]
fn legacy_fenced_response_becomes_an_editable_document() {
    let mut session = EditSession::new(enhancement_response());
    let doc = session.document();
    assert_eq!(doc["title"], json!("La célula"));
    assert_eq!(doc["sections"][0]["type"], json!("heading"));
    assert_eq!(doc["sections"][3]["items"], json!(["membrana", "citoplasma", "núcleo"]));

    // Granular edit of one paragraph, then a detached concept edit.
    session.write("sections.1.content", json!("Toda célula tiene membrana plasmática."));
    session.set_target(Some((
        "sections.2",
        json!({ "generated_content": { "definition": "central energética de la célula" } }),
    )));

    let store = MemoryStore::new();
    let report = session.save(&store);
    assert!(report.persisted);

    let saved = store.saved.borrow();
    assert_eq!(saved[0].title, Some("La célula".to_string()));
    let persisted: Value = serde_json::from_str(&saved[0].enhanced_text).unwrap();
    assert_eq!(
        persisted["sections"][1]["content"],
        json!("Toda célula tiene membrana plasmática.")
    );
    assert_eq!(persisted["sections"][2]["type"], json!("concept_block"));
    assert_eq!(
        persisted["sections"][2]["definition"],
        json!("central energética de la célula")
    );
}

#[test]
fn saved_document_exports_to_balanced_html() {
    let session = EditSession::new(enhancement_response());
    let doc: Document = serde_json::from_value(session.document()).unwrap();

    let text = document_to_text(&doc);
    assert!(text.contains("TÍTULO: Estructura celular"));
    assert!(text.contains("CONCEPTO: Mitocondria"));
    assert!(text.contains("🔑 CONCEPTOS CLAVE:"));

    let html = render_export_html(&doc, &RenderOptions::full());
    assert!(html.contains("<h1>Estructura celular</h1>"));
    assert!(html.contains("concept-term\">Mitocondria"));
    assert!(html.contains("concept-pill\">ATP"));
    for (open, close) in [("<div", "</div>"), ("<ul", "</ul>")] {
        assert_eq!(html.matches(open).count(), html.matches(close).count());
    }
}

#[test]
fn unparseable_response_degrades_to_raw_display() {
    let input = json!({ "raw_content": "the model produced prose only" });
    match normalize_document(input.clone()) {
        Normalized::Raw(raw) => assert_eq!(raw, input),
        Normalized::Document(doc) => panic!("expected raw fallback, got {doc:?}"),
    }
}

#[test]
fn unknown_section_type_survives_to_the_export() {
    let doc: Document = serde_json::from_value(json!({
        "sections": [
            { "type": "paragraph", "content": "conocido" },
            { "type": "cronograma", "hitos": ["parcial", "final"] }
        ]
    }))
    .unwrap();
    let html = render_markup(&document_to_text(&doc));
    assert!(html.contains("<p>conocido</p>"));
    assert!(html.contains("raw-block"));
    assert!(html.contains("cronograma"));
}
