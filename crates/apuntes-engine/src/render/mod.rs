//! Plain-text flattening and HTML rendering for PDF export.
//!
//! Rendering is a pipeline of three small passes:
//!
//! 1. [`text::document_to_text`] reduces a [`Document`](crate::schema::Document)
//!    to line-oriented plain text with literal prefixes (`"TÍTULO:"`,
//!    `"CONCEPTO:"`, ...).
//! 2. [`lexer::lex`] splits that text into `Text` and `JsonFragment`
//!    tokens, separating embedded structured data from prose.
//! 3. [`html::render_markup`] runs a line state machine over the tokens
//!    and emits tag-balanced HTML fragments.

pub mod html;
pub mod lexer;
pub mod text;

pub use html::render_markup;
pub use lexer::{Token, lex};
pub use text::document_to_text;
