//! The post-processing pipeline: metadata first, then AcroForm synthesis.

use crate::config::PostProcessConfig;
use crate::error::PipelineError;
use log::{debug, info, warn};
use mdforge_pdf::{AcroFormConfig, SynthesisReport, apply_metadata, load_document, save_document, synthesize_fields};
use mdforge_traits::{Executor, FontQuery, FontSource};
use mdforge_types::{EmbeddedFont, FormFontInfo};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Output of one post-processing run.
#[derive(Debug, Clone)]
pub struct ProcessedPdf {
    pub bytes: Vec<u8>,
    /// Present when AcroForm synthesis ran.
    pub report: Option<SynthesisReport>,
}

/// Applies configured metadata and form synthesis to rendered PDFs.
///
/// A processor is immutable once built and can be shared across threads for
/// batch work.
#[derive(Debug)]
pub struct PostProcessor {
    config: PostProcessConfig,
    fonts: Vec<EmbeddedFont>,
    font_source: Option<Arc<dyn FontSource>>,
}

impl PostProcessor {
    pub fn new(config: PostProcessConfig) -> Self {
        Self { config, fonts: Vec::new(), font_source: None }
    }

    pub fn builder() -> PostProcessorBuilder {
        PostProcessorBuilder::new()
    }

    pub fn config(&self) -> &PostProcessConfig {
        &self.config
    }

    /// Faces offered to the form font selection. When none were supplied the
    /// font source is asked for the observed family.
    fn candidate_fonts(&self) -> Vec<EmbeddedFont> {
        if !self.fonts.is_empty() {
            return self.fonts.clone();
        }
        let (Some(form_font), Some(source)) = (&self.config.form_font, &self.font_source) else {
            return Vec::new();
        };
        match source.find_font(&FontQuery::new(&form_font.font_family)) {
            Ok(font) => {
                debug!("{} supplied '{}' for form fields", source.name(), font.family);
                vec![font]
            }
            Err(e) => {
                warn!("No embeddable face for '{}': {}", form_font.font_family, e);
                Vec::new()
            }
        }
    }

    fn acroform_config(&self) -> AcroFormConfig {
        AcroFormConfig {
            select_options: self.config.select_options.clone(),
            form_font: self.config.form_font.clone(),
            embedded_fonts: self.candidate_fonts(),
        }
    }

    /// Post-processes one PDF.
    ///
    /// Returns the input unchanged when neither metadata nor form synthesis
    /// applies.
    pub fn process(&self, pdf: &[u8]) -> Result<ProcessedPdf, PipelineError> {
        let metadata = self.config.effective_metadata();
        if metadata.is_none() && !self.config.fillable {
            debug!("Nothing to post-process");
            return Ok(ProcessedPdf { bytes: pdf.to_vec(), report: None });
        }

        let mut doc = load_document(pdf)?;
        if let Some(metadata) = &metadata {
            apply_metadata(&mut doc, metadata)?;
        }

        let report = if self.config.fillable {
            Some(synthesize_fields(&mut doc, &self.acroform_config())?)
        } else {
            None
        };

        let bytes = save_document(&mut doc)?;
        info!("Post-processed PDF: {} -> {} bytes", pdf.len(), bytes.len());
        Ok(ProcessedPdf { bytes, report })
    }

    pub fn process_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<ProcessedPdf, PipelineError> {
        let pdf = fs::read(input)?;
        let processed = self.process(&pdf)?;
        fs::write(output, &processed.bytes)?;
        Ok(processed)
    }
}

/// Runs many documents through one processor. Each job is isolated: a
/// failing document yields an `Err` in its slot and the rest continue.
/// Results come back in input order.
pub fn process_batch<E: Executor>(
    executor: &E,
    processor: Arc<PostProcessor>,
    jobs: Vec<Vec<u8>>,
) -> Vec<Result<ProcessedPdf, PipelineError>> {
    debug!("Processing {} PDFs with {}", jobs.len(), executor.name());
    executor.execute_all_fallible(jobs, move |pdf| processor.process(&pdf))
}

/// Builder for [`PostProcessor`].
#[derive(Debug, Default)]
pub struct PostProcessorBuilder {
    config: PostProcessConfig,
    fonts: Vec<EmbeddedFont>,
    font_source: Option<Arc<dyn FontSource>>,
    base_path: Option<PathBuf>,
}

impl PostProcessorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: PostProcessConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads configuration from a JSON file. Font paths in it resolve
    /// against the file's directory.
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        self.config = PostProcessConfig::from_file(path)?;
        self.base_path = path.parent().map(Path::to_path_buf);
        Ok(self)
    }

    pub fn fillable(mut self, fillable: bool) -> Self {
        self.config.fillable = fillable;
        self
    }

    pub fn with_document_title(mut self, title: impl Into<String>) -> Self {
        self.config.document_title = Some(title.into());
        self
    }

    pub fn with_metadata(mut self, metadata: mdforge_pdf::PdfMetadata) -> Self {
        self.config.metadata = Some(metadata);
        self
    }

    pub fn with_select_options(mut self, name: impl Into<String>, options: Vec<String>) -> Self {
        self.config.select_options.insert(name.into(), options);
        self
    }

    pub fn with_form_font(mut self, font_family: impl Into<String>, font_size_px: f32) -> Self {
        self.config.form_font = Some(FormFontInfo { font_family: font_family.into(), font_size: font_size_px });
        self
    }

    pub fn with_font(mut self, font: EmbeddedFont) -> Self {
        self.fonts.push(font);
        self
    }

    /// Source consulted when no fonts were supplied directly.
    pub fn with_font_source(mut self, source: Arc<dyn FontSource>) -> Self {
        self.font_source = Some(source);
        self
    }

    /// Falls back to installed system fonts.
    #[cfg(feature = "system-fonts")]
    pub fn with_system_fonts(self) -> Self {
        self.with_font_source(Arc::new(mdforge_resource::SystemFontSource::new()))
    }

    pub fn build(mut self) -> Result<PostProcessor, PipelineError> {
        if let Some(form_font) = &self.config.form_font {
            if !form_font.font_size.is_finite() || form_font.font_size < 0.0 {
                return Err(PipelineError::Config(format!(
                    "form font size must be a non-negative number, got {}",
                    form_font.font_size
                )));
            }
        }

        let base_path = self.base_path.unwrap_or_else(|| PathBuf::from("."));
        let mut fonts = self.config.load_fonts(&base_path)?;
        fonts.append(&mut self.fonts);

        Ok(PostProcessor { config: self.config, fonts, font_source: self.font_source })
    }
}
