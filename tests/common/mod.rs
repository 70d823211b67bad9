#![allow(dead_code)]

pub mod fixtures;
pub mod pdf_assertions;

use lopdf::Document as LopdfDocument;
use mdforge::{PipelineError, PostProcessor, ProcessedPdf, SynthesisReport};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A post-processed PDF, reloaded for inspection.
pub struct OutputPdf {
    pub bytes: Vec<u8>,
    pub doc: LopdfDocument,
    pub report: Option<SynthesisReport>,
}

impl OutputPdf {
    pub fn from_processed(processed: ProcessedPdf) -> Result<Self, Box<dyn std::error::Error>> {
        let doc = LopdfDocument::load_mem(&processed.bytes)?;
        Ok(Self { bytes: processed.bytes, doc, report: processed.report })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    pub fn report(&self) -> &SynthesisReport {
        self.report.as_ref().expect("synthesis ran")
    }

    /// Save PDF to a file for manual debugging
    pub fn save_for_debug(&self, name: &str) -> std::io::Result<()> {
        std::fs::write(format!("test_output_{}.pdf", name), &self.bytes)
    }
}

/// Runs `pdf` through `processor` and reloads the result.
pub fn run(processor: &PostProcessor, pdf: &[u8]) -> Result<OutputPdf, Box<dyn std::error::Error>> {
    let processed: Result<ProcessedPdf, PipelineError> = processor.process(pdf);
    OutputPdf::from_processed(processed?)
}

/// A processor with form synthesis on and nothing else configured.
pub fn fillable_processor() -> PostProcessor {
    PostProcessor::builder().fillable(true).build().expect("valid configuration")
}
