use thiserror::Error;

/// Failures that abort post-processing of a whole document.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to load PDF: {0}")]
    Load(#[source] lopdf::Error),

    #[error("Failed to save PDF: {0}")]
    Save(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Font embedding failed: {0}")]
    Font(String),

    #[error("Malformed document structure: {0}")]
    Structure(String),
}

/// Failures confined to a single form field. These are recorded and the
/// field is skipped; they never abort the document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("a field named '{0}' already exists")]
    DuplicateName(String),

    /// The name, or one of its leading parts, is used both as a field and
    /// as a group of named fields.
    #[error("'{0}' is used both as a field and as a field group")]
    NameConflict(String),

    #[error("page {0} does not exist")]
    PageNotFound(usize),

    #[error("invalid field state: {0}")]
    InvalidState(String),
}

impl From<lopdf::Error> for FieldError {
    fn from(e: lopdf::Error) -> Self {
        FieldError::InvalidState(e.to_string())
    }
}
