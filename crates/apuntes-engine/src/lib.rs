pub mod export;
pub mod normalize;
pub mod path;
pub mod render;
pub mod schema;
pub mod session;

// Re-export key types for easier usage
pub use export::{
    ExportError, PdfArtifact, PdfClient, PdfError, RenderOptions, export_pdf, render_export_html,
};
pub use normalize::{Normalized, normalize, normalize_document};
pub use render::{document_to_text, render_markup};
pub use schema::{CanonicalTarget, Document, LegacyBlock, ListStyle, Section, legacy_target};
pub use session::{
    EditSession, NoteStore, PersistError, SavePayload, SaveReport, Scope, SectionArena, SectionId,
};
