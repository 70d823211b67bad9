//! mdforge PDF post-processing.
//!
//! Takes a PDF rendered from markdown by a headless browser and finishes it:
//! document metadata goes into `/Info`, and the invisible marker links the
//! HTML layer placed over form controls become fillable AcroForm fields.
//!
//! ```ignore
//! use mdforge::PostProcessor;
//!
//! let processor = PostProcessor::builder()
//!     .fillable(true)
//!     .with_form_font("Inter", 16.0)
//!     .with_system_fonts()
//!     .build()?;
//! let processed = processor.process(&rendered_pdf)?;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod processor;

pub use config::{FontFileConfig, PostProcessConfig};
pub use error::PipelineError;
pub use executor::{Executor, ExecutorImpl, SyncExecutor};
#[cfg(feature = "rayon-executor")]
pub use executor::RayonExecutor;
pub use processor::{PostProcessor, PostProcessorBuilder, ProcessedPdf, process_batch};

pub use mdforge_pdf::{
    AcroFormConfig, FieldOutcome, PdfError, PdfMetadata, SynthesisReport, add_acroform_fields,
    add_acroform_fields_with_report, inject_metadata,
};
pub use mdforge_types::{EmbeddedFont, FieldKind, FieldPosition, FontStyle, FormFontInfo, Rect};
