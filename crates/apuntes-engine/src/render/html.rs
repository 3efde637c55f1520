//! Line-oriented markup → HTML state machine.
//!
//! Consumes the token stream from the lexer and emits HTML fragments for
//! the PDF export. The parser is single-pass: one mode is open at a time,
//! a blank line closes it, and anything unclassified accumulates into a
//! plain paragraph. Every container opened is closed, including at end of
//! input, so the output is always tag-balanced.

use serde_json::Value;

use crate::render::lexer::{Token, lex};
use crate::render::text::{
    CONCEPT_PREFIX, DEFINITION_PREFIX, EXAMPLES_PREFIX, KEY_CONCEPTS_PREFIX, SUMMARY_PREFIX,
    TITLE_PREFIX,
};

/// Render flattened document text to HTML fragments.
pub fn render_markup(input: &str) -> String {
    let mut parser = LineParser::default();
    for token in lex(input) {
        match token {
            Token::Text(text) => {
                for line in text.lines() {
                    parser.line(line);
                }
            }
            Token::JsonFragment { source, value } => parser.fragment(&value, source),
        }
    }
    parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    None,
    Concept,
    Examples,
    Summary,
    KeyConcepts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bulleted,
    Numbered,
}

#[derive(Default)]
struct LineParser {
    out: String,
    mode: Mode,
    /// An examples container can sit inside an open concept block; closing
    /// the mode must then close both.
    concept_open: bool,
    paragraph: Vec<String>,
    list: Option<(ListKind, Vec<String>)>,
}

impl LineParser {
    fn line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            self.flush_pending();
            self.close_mode();
            return;
        }

        if let Some(rest) = line.strip_prefix("TÍTULO (Nivel ")
            && let Some((level, content)) = parse_leveled_title(rest)
        {
            self.open_block();
            self.push_element(&format!("<h{level}>{}</h{level}>", escape(content)));
            return;
        }
        if let Some(content) = line.strip_prefix(TITLE_PREFIX) {
            self.open_block();
            self.push_element(&format!("<h1>{}</h1>", escape(content.trim())));
            return;
        }
        if let Some(term) = line.strip_prefix(CONCEPT_PREFIX) {
            self.open_block();
            self.push_element(&format!(
                "<div class=\"concept-block\"><h3 class=\"concept-term\">{}</h3>",
                escape(term.trim())
            ));
            self.mode = Mode::Concept;
            self.concept_open = true;
            return;
        }
        if self.mode == Mode::Concept
            && let Some(definition) = line.strip_prefix(DEFINITION_PREFIX)
        {
            self.push_element(&format!(
                "<p class=\"definition\">{}</p>",
                escape(definition.trim())
            ));
            return;
        }
        if let Some(rest) = line.strip_prefix(EXAMPLES_PREFIX) {
            if self.mode != Mode::Concept {
                self.open_block();
            } else {
                self.flush_pending();
            }
            self.push_element("<div class=\"examples\"><ul>");
            self.mode = Mode::Examples;
            if !rest.trim().is_empty() {
                self.push_element(&format!("<li>{}</li>", escape(rest.trim())));
            }
            return;
        }
        if let Some(rest) = line.strip_prefix(SUMMARY_PREFIX) {
            self.open_block();
            self.push_element("<div class=\"summary-block\">");
            self.mode = Mode::Summary;
            if !rest.trim().is_empty() {
                self.paragraph.push(rest.trim().to_string());
            }
            return;
        }
        if line.strip_prefix(KEY_CONCEPTS_PREFIX).is_some() {
            self.open_block();
            self.push_element("<div class=\"key-concepts\"><ul class=\"concept-pills\">");
            self.mode = Mode::KeyConcepts;
            return;
        }

        if let Some(item) = bullet_item(line) {
            match self.mode {
                Mode::Examples => self.push_element(&format!("<li>{}</li>", escape(item))),
                Mode::KeyConcepts => self.push_element(&format!(
                    "<li class=\"concept-pill\">{}</li>",
                    escape(item)
                )),
                _ => self.push_list_item(ListKind::Bulleted, item),
            }
            return;
        }
        if let Some(item) = numbered_item(line) {
            match self.mode {
                Mode::Examples => self.push_element(&format!("<li>{}</li>", escape(item))),
                Mode::KeyConcepts => self.push_element(&format!(
                    "<li class=\"concept-pill\">{}</li>",
                    escape(item)
                )),
                _ => self.push_list_item(ListKind::Numbered, item),
            }
            return;
        }

        // Unclassified content degrades to paragraph text, never dropped.
        match self.mode {
            Mode::Examples => self.push_element(&format!("<li>{}</li>", escape(line))),
            Mode::KeyConcepts => self.push_element(&format!(
                "<li class=\"concept-pill\">{}</li>",
                escape(line)
            )),
            _ => {
                self.flush_list();
                self.paragraph.push(line.to_string());
            }
        }
    }

    fn fragment(&mut self, value: &Value, source: &str) {
        self.open_block();
        if value.get("type").and_then(Value::as_str) == Some("key_concepts_block") {
            self.push_element("<div class=\"key-concepts\"><ul class=\"concept-pills\">");
            if let Some(concepts) = value.get("concepts").and_then(Value::as_array) {
                for concept in concepts {
                    let text = match concept {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    self.push_element(&format!(
                        "<li class=\"concept-pill\">{}</li>",
                        escape(&text)
                    ));
                }
            }
            self.push_element("</ul></div>");
        } else {
            self.push_element(&format!("<pre class=\"raw-block\">{}</pre>", escape(source)));
        }
    }

    fn finish(mut self) -> String {
        self.flush_pending();
        self.close_mode();
        self.out
    }

    /// Start a new top-level block: flush accumulation and close any open
    /// mode container.
    fn open_block(&mut self) {
        self.flush_pending();
        self.close_mode();
    }

    fn close_mode(&mut self) {
        self.flush_pending();
        match self.mode {
            Mode::None => {}
            Mode::Concept => self.push_element("</div>"),
            Mode::Examples => {
                self.push_element("</ul></div>");
                if self.concept_open {
                    self.push_element("</div>");
                }
            }
            Mode::Summary => self.push_element("</div>"),
            Mode::KeyConcepts => self.push_element("</ul></div>"),
        }
        self.mode = Mode::None;
        self.concept_open = false;
    }

    fn flush_pending(&mut self) {
        self.flush_paragraph();
        self.flush_list();
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join(" ");
        self.paragraph.clear();
        self.push_element(&format!("<p>{}</p>", escape(&text)));
    }

    fn flush_list(&mut self) {
        let Some((kind, items)) = self.list.take() else {
            return;
        };
        let tag = match kind {
            ListKind::Bulleted => "ul",
            ListKind::Numbered => "ol",
        };
        let mut element = format!("<{tag}>");
        for item in items {
            element.push_str(&format!("<li>{}</li>", escape(&item)));
        }
        element.push_str(&format!("</{tag}>"));
        self.push_element(&element);
    }

    fn push_list_item(&mut self, kind: ListKind, item: &str) {
        self.flush_paragraph();
        if let Some((open_kind, _)) = &self.list
            && *open_kind != kind
        {
            self.flush_list();
        }
        match &mut self.list {
            Some((_, items)) => items.push(item.to_string()),
            None => self.list = Some((kind, vec![item.to_string()])),
        }
    }

    fn push_element(&mut self, element: &str) {
        self.out.push_str(element);
        self.out.push('\n');
    }
}

fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Parse the tail of `"TÍTULO (Nivel N): content"`.
fn parse_leveled_title(rest: &str) -> Option<(u8, &str)> {
    let (level, content) = rest.split_once("):")?;
    let level: u8 = level.trim().parse().ok()?;
    Some((level.clamp(1, 6), content.trim()))
}

fn bullet_item(line: &str) -> Option<&str> {
    line.strip_prefix("• ")
        .or_else(|| line.strip_prefix("- "))
        .map(str::trim)
}

fn numbered_item(line: &str) -> Option<&str> {
    let (number, rest) = line.split_once(". ")?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(rest.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_balanced(html: &str) {
        for (open, close) in [
            ("<div", "</div>"),
            ("<ul", "</ul>"),
            ("<ol", "</ol>"),
            ("<p", "</p"),
        ] {
            assert_eq!(
                html.matches(open).count(),
                html.matches(close).count(),
                "unbalanced {open} in:\n{html}"
            );
        }
    }

    #[test]
    fn test_concept_scenario_renders_balanced_container() {
        let html = render_markup("CONCEPTO: A\nDEFINICIÓN: B\nEJEMPLOS:\n• C\n\n");
        assert!(html.contains("<h3 class=\"concept-term\">A</h3>"));
        assert!(html.contains("<p class=\"definition\">B</p>"));
        assert!(html.contains("<li>C</li>"));
        assert_balanced(&html);
    }

    #[test]
    fn test_modes_close_at_end_of_input_without_trailing_blank() {
        let html = render_markup("📋 RESUMEN:\nun resumen");
        assert!(html.contains("<div class=\"summary-block\">"));
        assert!(html.contains("<p>un resumen</p>"));
        assert_balanced(&html);
    }

    #[test]
    fn test_title_prefixes_become_headings() {
        let html = render_markup("TÍTULO: Uno\n\nTÍTULO (Nivel 3): Tres\n");
        assert!(html.contains("<h1>Uno</h1>"));
        assert!(html.contains("<h3>Tres</h3>"));
    }

    #[test]
    fn test_loose_lines_accumulate_into_one_paragraph() {
        let html = render_markup("primera línea\nsegunda línea\n\ntercera\n");
        assert!(html.contains("<p>primera línea segunda línea</p>"));
        assert!(html.contains("<p>tercera</p>"));
    }

    #[test]
    fn test_new_block_prefix_closes_the_open_paragraph() {
        let html = render_markup("texto suelto\nCONCEPTO: X\n\n");
        assert!(html.contains("<p>texto suelto</p>"));
        assert!(html.contains("concept-term\">X"));
        assert_balanced(&html);
    }

    #[test]
    fn test_bullets_outside_modes_group_into_a_list() {
        let html = render_markup("• uno\n• dos\n\n1. tres\n2. cuatro\n");
        assert!(html.contains("<ul><li>uno</li><li>dos</li></ul>"));
        assert!(html.contains("<ol><li>tres</li><li>cuatro</li></ol>"));
        assert_balanced(&html);
    }

    #[test]
    fn test_key_concepts_prefix_renders_pills() {
        let html = render_markup("🔑 CONCEPTOS CLAVE:\n• ATP\n• ADN\n\n");
        assert!(html.contains("concept-pill\">ATP"));
        assert!(html.contains("concept-pill\">ADN"));
        assert_balanced(&html);
    }

    #[test]
    fn test_embedded_key_concepts_fragment_renders_pills() {
        let html = render_markup(
            "párrafo\n\n{\"type\":\"key_concepts_block\",\"concepts\":[\"mol\",\"ion\"]}\n",
        );
        assert!(html.contains("concept-pill\">mol"));
        assert!(html.contains("concept-pill\">ion"));
        assert_balanced(&html);
    }

    #[test]
    fn test_unknown_fragment_renders_as_visible_raw_block() {
        let html = render_markup("{\"type\":\"timeline\",\"events\":[\"x\"]}\n");
        assert!(html.contains("<pre class=\"raw-block\">"));
        assert!(html.contains("timeline"));
        assert_balanced(&html);
    }

    #[test]
    fn test_text_is_html_escaped() {
        let html = render_markup("a < b & c > d\n");
        assert!(html.contains("a &lt; b &amp; c &gt; d"));
    }

    #[test]
    fn test_consecutive_concepts_without_blank_lines_stay_balanced() {
        let html = render_markup("CONCEPTO: A\nDEFINICIÓN: a\nCONCEPTO: B\nDEFINICIÓN: b\n\n");
        assert_eq!(html.matches("concept-block").count(), 2);
        assert_balanced(&html);
    }
}
