use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shared font data type (reference-counted bytes).
pub type SharedFontData = Arc<Vec<u8>>;

/// The CSS numeric weight of a regular face.
pub const REGULAR_WEIGHT: u16 = 400;

/// CSS `font-style` keyword of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    /// Parses a CSS keyword. Anything unrecognized is treated as `normal`.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "italic" => FontStyle::Italic,
            "oblique" => FontStyle::Oblique,
            _ => FontStyle::Normal,
        }
    }
}

impl fmt::Display for FontStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
            FontStyle::Oblique => "oblique",
        };
        f.write_str(keyword)
    }
}

/// A font face that may be embedded into a document for form fields.
#[derive(Clone)]
pub struct EmbeddedFont {
    pub family: String,
    pub weight: u16,
    pub style: FontStyle,
    pub data: SharedFontData,
}

impl EmbeddedFont {
    pub fn new(family: impl Into<String>, weight: u16, style: FontStyle, data: SharedFontData) -> Self {
        Self { family: family.into(), weight, style, data }
    }

    pub fn is_regular(&self) -> bool {
        self.weight == REGULAR_WEIGHT && self.style == FontStyle::Normal
    }
}

// Font blobs run to megabytes; keep them out of debug output.
impl fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("family", &self.family)
            .field("weight", &self.weight)
            .field("style", &self.style)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Font family and CSS pixel size observed on the rendered form controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFontInfo {
    pub font_family: String,
    pub font_size: f32,
}

impl FormFontInfo {
    pub fn new(font_family: impl Into<String>, font_size: f32) -> Self {
        Self { font_family: font_family.into(), font_size }
    }
}
