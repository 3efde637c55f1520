//! Document → plain text reducer.
//!
//! Flattens the typed tree into the line-oriented text consumed by the
//! markup renderer. Sections the schema does not recognise are emitted as
//! their verbatim single-line JSON so the renderer can show them as a raw
//! fallback block instead of dropping them.

use crate::schema::{Document, ListStyle, Section};

pub const TITLE_PREFIX: &str = "TÍTULO:";
pub const CONCEPT_PREFIX: &str = "CONCEPTO:";
pub const DEFINITION_PREFIX: &str = "DEFINICIÓN:";
pub const EXAMPLES_PREFIX: &str = "EJEMPLOS:";
pub const SUMMARY_PREFIX: &str = "📋 RESUMEN:";
pub const KEY_CONCEPTS_PREFIX: &str = "🔑 CONCEPTOS CLAVE:";

/// Flatten a document into renderer input, blocks separated by blank lines.
pub fn document_to_text(doc: &Document) -> String {
    let mut blocks: Vec<String> = Vec::new();

    if let Some(title) = &doc.title {
        blocks.push(format!("{TITLE_PREFIX} {title}"));
    }
    if let Some(summary) = &doc.summary {
        blocks.push(format!("{SUMMARY_PREFIX}\n{summary}"));
    }
    for section in &doc.sections {
        blocks.push(section_to_text(section));
    }
    if let Some(concepts) = &doc.key_concepts
        && !concepts.is_empty()
    {
        blocks.push(key_concepts_to_text(concepts));
    }

    let mut out = blocks.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn section_to_text(section: &Section) -> String {
    match section {
        Section::Heading { level: 1, content } => format!("{TITLE_PREFIX} {content}"),
        Section::Heading { level, content } => format!("TÍTULO (Nivel {level}): {content}"),
        Section::Paragraph { content } => content.clone(),
        Section::List { style, items } => {
            let lines: Vec<String> = items
                .iter()
                .enumerate()
                .map(|(ix, item)| match style {
                    ListStyle::Bulleted => format!("• {item}"),
                    ListStyle::Numbered => format!("{}. {item}", ix + 1),
                })
                .collect();
            lines.join("\n")
        }
        Section::ConceptBlock {
            term,
            definition,
            examples,
        } => {
            let mut lines = vec![format!("{CONCEPT_PREFIX} {term}")];
            if let Some(definition) = definition {
                lines.push(format!("{DEFINITION_PREFIX} {definition}"));
            }
            if !examples.is_empty() {
                lines.push(EXAMPLES_PREFIX.to_string());
                for example in examples {
                    lines.push(format!("• {example}"));
                }
            }
            lines.join("\n")
        }
        Section::SummaryBlock { content } => format!("{SUMMARY_PREFIX}\n{content}"),
        Section::KeyConceptsBlock { concepts } => key_concepts_to_text(concepts),
        Section::Quote { content } => content.clone(),
        Section::Code { content } => content.clone(),
        Section::Formula {
            content,
            description,
        } => match description {
            Some(description) => format!("{content}\n{description}"),
            None => content.clone(),
        },
        Section::Example { content } => content.clone(),
        Section::ImportantNote { content } => content.clone(),
        Section::Other(value) => value.to_string(),
    }
}

fn key_concepts_to_text(concepts: &[String]) -> String {
    let mut lines = vec![KEY_CONCEPTS_PREFIX.to_string()];
    for concept in concepts {
        lines.push(format!("• {concept}"));
    }
    lines.join("\n")
}
