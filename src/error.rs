use mdforge_pdf::PdfError;
use mdforge_traits::FontError;
use thiserror::Error;

/// Errors surfaced by the post-processing pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("PDF processing failed: {0}")]
    Pdf(#[from] PdfError),

    #[error("Font error: {0}")]
    Font(#[from] FontError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
