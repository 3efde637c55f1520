//! PDF export boundary.
//!
//! Wraps the rendered markup in a fixed stylesheet template and hands the
//! HTML document to the PDF collaborator. Generation failure is retried
//! once with the minimal render configuration; a second failure is fatal
//! and surfaced to the user.

use serde::Deserialize;
use thiserror::Error;

use crate::render::{document_to_text, render_markup};
use crate::schema::Document;

/// Render configuration for the export template.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub page_title: Option<String>,
    /// Replacement stylesheet text; the built-in full stylesheet is used
    /// when unset. Ignored by the minimal configuration.
    pub stylesheet: Option<String>,
    pub full_styles: bool,
}

impl RenderOptions {
    pub fn full() -> Self {
        Self {
            page_title: None,
            stylesheet: None,
            full_styles: true,
        }
    }

    /// Reduced-feature configuration used for the retry after a failed
    /// generation.
    pub fn minimal() -> Self {
        Self {
            page_title: None,
            stylesheet: None,
            full_styles: false,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::full()
    }
}

const FULL_STYLESHEET: &str = "\
body { font-family: 'Segoe UI', sans-serif; margin: 2.5cm; color: #1a1a2e; line-height: 1.5; }
h1 { color: #16213e; border-bottom: 2px solid #0f3460; padding-bottom: 0.2em; }
h2, h3 { color: #16213e; }
.concept-block { background: #f0f4ff; border-left: 4px solid #0f3460; padding: 0.8em 1em; margin: 1em 0; }
.concept-term { margin: 0 0 0.3em 0; }
.definition { font-style: italic; margin: 0.3em 0; }
.examples ul { margin: 0.3em 0 0 1.2em; }
.summary-block { background: #fffbe6; border: 1px solid #e0c36a; border-radius: 6px; padding: 0.8em 1em; margin: 1em 0; }
.key-concepts ul.concept-pills { list-style: none; padding: 0; margin: 0.5em 0; }
.key-concepts li.concept-pill { display: inline-block; background: #0f3460; color: #fff; border-radius: 1em; padding: 0.15em 0.8em; margin: 0.15em; }
.raw-block { background: #f5f5f5; border: 1px dashed #999; padding: 0.6em; white-space: pre-wrap; }
";

const MINIMAL_STYLESHEET: &str = "\
body { font-family: sans-serif; margin: 2cm; }
.raw-block { white-space: pre-wrap; }
";

/// Flatten, render and wrap a document into a full HTML page for the PDF
/// collaborator.
pub fn render_export_html(doc: &Document, options: &RenderOptions) -> String {
    let body = render_markup(&document_to_text(doc));
    let stylesheet = if options.full_styles {
        options.stylesheet.as_deref().unwrap_or(FULL_STYLESHEET)
    } else {
        MINIMAL_STYLESHEET
    };
    let title = options
        .page_title
        .as_deref()
        .or(doc.title.as_deref())
        .unwrap_or("Apuntes");
    format!(
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        html_escape::encode_text(title),
        stylesheet,
        body
    )
}

/// Response from the PDF collaborator; either URL field may be set.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct PdfArtifact {
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl PdfArtifact {
    pub fn url(&self) -> Option<&str> {
        self.pdf_url.as_deref().or(self.download_url.as_deref())
    }
}

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("pdf generation failed: {0}")]
    Generation(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("pdf generation failed after fallback retry: {0}")]
    PdfFailed(#[from] PdfError),
}

/// PDF collaborator. Consumed, never implemented here.
pub trait PdfClient {
    fn generate(&self, html: &str) -> Result<PdfArtifact, PdfError>;
}

/// Export a document as PDF, retrying once with [`RenderOptions::minimal`]
/// before giving up.
pub fn export_pdf(
    doc: &Document,
    options: &RenderOptions,
    client: &dyn PdfClient,
) -> Result<PdfArtifact, ExportError> {
    let html = render_export_html(doc, options);
    match client.generate(&html) {
        Ok(artifact) => Ok(artifact),
        Err(_) => {
            let fallback = render_export_html(doc, &RenderOptions::minimal());
            client.generate(&fallback).map_err(ExportError::PdfFailed)
        }
    }
}
