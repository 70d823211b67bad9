//! Post-processing configuration, usually read from a JSON file next to the
//! rendered PDF.

use crate::error::PipelineError;
use mdforge_pdf::PdfMetadata;
use mdforge_pdf::metadata::DEFAULT_CREATOR;
use mdforge_resource::FontFileLoader;
use mdforge_traits::FontError;
use mdforge_types::{EmbeddedFont, FontStyle, FormFontInfo, REGULAR_WEIGHT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

fn regular_weight() -> u16 {
    REGULAR_WEIGHT
}

/// A font file offered for embedding into form fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontFileConfig {
    /// Path to a `.ttf` or `.otf` file, relative to the config file.
    pub path: PathBuf,
    /// Family name; read from the font when omitted.
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default = "regular_weight")]
    pub weight: u16,
    #[serde(default)]
    pub style: FontStyle,
}

/// Everything the post-processor needs besides the PDF itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostProcessConfig {
    /// Turn marker links into AcroForm fields.
    pub fillable: bool,
    /// Title of the source document, used when no metadata title is given.
    pub document_title: Option<String>,
    pub metadata: Option<PdfMetadata>,
    /// Choices of each `select` field, keyed by field name.
    pub select_options: HashMap<String, Vec<String>>,
    /// Font observed on the rendered form controls.
    pub form_font: Option<FormFontInfo>,
    pub fonts: Vec<FontFileConfig>,
}

impl PostProcessConfig {
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Metadata to write, or `None` when no `metadata` block is configured or
    /// it has nothing descriptive to add.
    ///
    /// Within a configured block the title falls back to `document_title` and
    /// the creator defaults to `mdforge`. A document title alone never
    /// touches `/Info`.
    pub fn effective_metadata(&self) -> Option<PdfMetadata> {
        let mut metadata = self.metadata.clone()?;
        if metadata.title.as_deref().is_none_or(str::is_empty) {
            metadata.title = self.document_title.clone().filter(|t| !t.is_empty());
        }
        if !metadata.has_content() {
            return None;
        }
        if metadata.creator.as_deref().is_none_or(str::is_empty) {
            metadata.creator = Some(DEFAULT_CREATOR.to_string());
        }
        Some(metadata)
    }

    /// Reads every configured font file, resolving relative paths against
    /// `base_path`.
    pub fn load_fonts(&self, base_path: &Path) -> Result<Vec<EmbeddedFont>, FontError> {
        let loader = FontFileLoader::new(base_path);
        self.fonts
            .iter()
            .map(|f| loader.load(&f.path, f.family.as_deref(), f.weight, f.style))
            .collect()
    }
}
