//! PDF post-processing for mdforge.
//!
//! The headline feature is AcroForm synthesis: the HTML templating layer
//! places an invisible marker link over every form control, and
//! [`add_acroform_fields`] replaces those links with real, fillable fields at
//! the same positions. Document metadata injection lives in [`metadata`].

pub mod appearance;
pub mod content;
pub mod error;
pub mod extract;
pub mod fonts;
pub mod form;
pub mod grouping;
pub mod marker;
pub mod metadata;
mod page;
pub mod synthesize;
pub mod text;

pub use error::{FieldError, PdfError};
pub use extract::extract_and_remove_markers;
pub use fonts::{FormFont, embed_font, form_font_size, select_font};
pub use form::AcroForm;
pub use grouping::{FieldGroups, group_fields};
pub use marker::{MARKER_URL_PREFIX, MarkerInfo, marker_anchor_html};
pub use metadata::{PdfMetadata, apply_metadata, inject_metadata};
pub use synthesize::{
    AcroFormConfig, FieldOutcome, SkipReason, SynthesisReport, add_acroform_fields,
    add_acroform_fields_with_report, synthesize_fields,
};

use lopdf::Document;

/// Parses a PDF from memory.
pub fn load_document(pdf: &[u8]) -> Result<Document, PdfError> {
    Document::load_mem(pdf).map_err(PdfError::Load)
}

/// Serializes a document to bytes.
pub fn save_document(doc: &mut Document) -> Result<Vec<u8>, PdfError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(|e| PdfError::Save(e.to_string()))?;
    Ok(buffer)
}
