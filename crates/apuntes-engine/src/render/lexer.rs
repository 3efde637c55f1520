//! Two-token lexer separating embedded JSON from prose.
//!
//! The flattened text of a document can carry raw JSON fragments verbatim
//! (unknown sections, and `key_concepts_block` values some upstream
//! responses emit as-is). Finding that structured data is a separate
//! concern from interpreting prose, so a single pass over the input splits
//! it into two token kinds before the line parser runs.
//!
//! The lexer is lossless: every byte of the input appears in exactly one
//! token, so concatenating the token sources reproduces the input.

use serde_json::Value;

use crate::normalize::first_balanced_object;

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Prose, passed to the line parser.
    Text(&'a str),
    /// A brace-balanced span that parses as a JSON object with a `type`
    /// field.
    JsonFragment { source: &'a str, value: Value },
}

impl Token<'_> {
    pub fn source(&self) -> &str {
        match self {
            Token::Text(source) => source,
            Token::JsonFragment { source, .. } => source,
        }
    }
}

/// Tokenize renderer input. Braces that do not open a parseable block
/// fragment stay part of the surrounding text.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut emitted = 0;
    let mut scan_from = 0;

    while let Some(offset) = input[scan_from..].find('{') {
        let start = scan_from + offset;
        match fragment_at(&input[start..]) {
            Some((len, value)) => {
                if emitted < start {
                    tokens.push(Token::Text(&input[emitted..start]));
                }
                tokens.push(Token::JsonFragment {
                    source: &input[start..start + len],
                    value,
                });
                emitted = start + len;
                scan_from = emitted;
            }
            None => scan_from = start + 1,
        }
    }
    if emitted < input.len() {
        tokens.push(Token::Text(&input[emitted..]));
    }
    tokens
}

fn fragment_at(rest: &str) -> Option<(usize, Value)> {
    let span = first_balanced_object(rest)?;
    if !rest.starts_with(span) {
        return None;
    }
    let value: Value = serde_json::from_str(span).ok()?;
    value.get("type").and_then(Value::as_str)?;
    Some((span.len(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_plain_text_is_one_token() {
        let tokens = lex("CONCEPTO: A\nDEFINICIÓN: B\n");
        assert_eq!(tokens, vec![Token::Text("CONCEPTO: A\nDEFINICIÓN: B\n")]);
    }

    #[test]
    fn test_embedded_fragment_is_split_out() {
        let input = "antes\n{\"type\":\"key_concepts_block\",\"concepts\":[\"ATP\"]}\ndespués\n";
        let tokens = lex(input);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::Text("antes\n"));
        match &tokens[1] {
            Token::JsonFragment { value, .. } => {
                assert_eq!(value["concepts"], json!(["ATP"]));
            }
            other => panic!("expected a fragment, got {other:?}"),
        }
        assert_eq!(tokens[2], Token::Text("\ndespués\n"));
    }

    #[test]
    fn test_prose_braces_stay_text() {
        let input = "la función {x} no es JSON, y {\"tampoco\": esto}\n";
        assert_eq!(lex(input), vec![Token::Text(input)]);
    }

    #[test]
    fn test_object_without_type_field_stays_text() {
        let input = "datos {\"a\": 1} sueltos";
        assert_eq!(lex(input), vec![Token::Text(input)]);
    }

    #[test]
    fn test_lexing_is_lossless() {
        let inputs = [
            "",
            "solo prosa",
            "{\"type\":\"formula\",\"content\":\"E=mc^2\"}",
            "a {\"type\":\"x\"} b {\"type\":\"y\"} c",
            "desbalanceado { y luego {\"type\":\"z\"}",
        ];
        for input in inputs {
            let reconstructed: String = lex(input).iter().map(Token::source).collect();
            assert_eq!(reconstructed, input);
        }
    }
}
