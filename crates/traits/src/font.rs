//! FontSource trait for locating embeddable font faces.
//!
//! Form field synthesis only ever needs the raw bytes of one face, so a
//! source answers a family/weight/style query with an [`EmbeddedFont`].

use mdforge_types::{EmbeddedFont, FontStyle, REGULAR_WEIGHT, SharedFontData};
use std::fmt::Debug;
use std::sync::RwLock;
use thiserror::Error;

/// Error type for font lookup and loading.
#[derive(Error, Debug, Clone)]
pub enum FontError {
    #[error("Font not found: {family} (weight: {weight}, style: {style})")]
    NotFound {
        family: String,
        weight: u16,
        style: FontStyle,
    },

    #[error("Failed to load font '{path}': {message}")]
    LoadFailed { path: String, message: String },

    #[error("Unsupported font format: {0}")]
    UnsupportedFormat(String),
}

/// A query for one font face.
#[derive(Debug, Clone, Copy)]
pub struct FontQuery<'a> {
    pub family: &'a str,
    pub weight: u16,
    pub style: FontStyle,
}

impl<'a> FontQuery<'a> {
    /// A query for the regular (400, normal) face of `family`.
    pub fn new(family: &'a str) -> Self {
        Self {
            family,
            weight: REGULAR_WEIGHT,
            style: FontStyle::Normal,
        }
    }

    pub fn with_weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    fn not_found(&self) -> FontError {
        FontError::NotFound {
            family: self.family.to_string(),
            weight: self.weight,
            style: self.style,
        }
    }
}

/// Something that can hand out font faces for embedding.
///
/// Implementations include the in-memory store below and the fontdb-backed
/// system lookup in `mdforge-resource`.
pub trait FontSource: Send + Sync + Debug {
    fn find_font(&self, query: &FontQuery<'_>) -> Result<EmbeddedFont, FontError>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;
}

/// A font source over pre-loaded faces.
#[derive(Debug, Default)]
pub struct InMemoryFontSource {
    fonts: RwLock<Vec<EmbeddedFont>>,
}

impl InMemoryFontSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a face to the store.
    ///
    /// # Errors
    ///
    /// Returns `FontError::LoadFailed` if the internal lock is poisoned.
    pub fn add_font(
        &self,
        family: impl Into<String>,
        weight: u16,
        style: FontStyle,
        data: SharedFontData,
    ) -> Result<(), FontError> {
        let font = EmbeddedFont::new(family, weight, style, data);
        let mut fonts = self.fonts.write().map_err(|_| FontError::LoadFailed {
            path: format!("{}:{}:{}", font.family, font.weight, font.style),
            message: "font store lock poisoned".to_string(),
        })?;
        fonts.push(font);
        Ok(())
    }

    /// Number of stored faces. Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.fonts.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of every stored face, in insertion order.
    pub fn fonts(&self) -> Vec<EmbeddedFont> {
        self.fonts.read().map(|f| f.clone()).unwrap_or_default()
    }
}

impl FontSource for InMemoryFontSource {
    fn find_font(&self, query: &FontQuery<'_>) -> Result<EmbeddedFont, FontError> {
        let fonts = self.fonts.read().map_err(|_| query.not_found())?;
        let in_family = |f: &&EmbeddedFont| f.family.eq_ignore_ascii_case(query.family);

        // Exact face first, then the closest weight with the same style.
        fonts
            .iter()
            .filter(in_family)
            .find(|f| f.weight == query.weight && f.style == query.style)
            .or_else(|| {
                fonts
                    .iter()
                    .filter(in_family)
                    .filter(|f| f.style == query.style)
                    .min_by_key(|f| (f.weight as i32 - query.weight as i32).abs())
            })
            .cloned()
            .ok_or_else(|| query.not_found())
    }

    fn name(&self) -> &'static str {
        "InMemoryFontSource"
    }
}
