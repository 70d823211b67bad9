//! Loads embeddable font files from the local filesystem.
//!
//! Paths are resolved relative to a base directory, typically the directory
//! of the configuration file that names them.

use mdforge_traits::FontError;
use mdforge_types::{EmbeddedFont, FontStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extensions ttf-parser can read and a PDF can embed directly.
const SUPPORTED_EXTENSIONS: &[&str] = &["ttf", "otf"];

/// Loads font files into [`EmbeddedFont`] values.
#[derive(Debug, Clone)]
pub struct FontFileLoader {
    base_path: PathBuf,
}

impl FontFileLoader {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self { base_path: base_path.as_ref().to_path_buf() }
    }

    pub fn base(&self) -> &Path {
        &self.base_path
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Reads one font file.
    ///
    /// When `family` is `None` the family is read from the font's own name
    /// table.
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` for anything but `.ttf`/`.otf`, `LoadFailed` when
    /// the file cannot be read or is not a parseable font.
    pub fn load(
        &self,
        path: impl AsRef<Path>,
        family: Option<&str>,
        weight: u16,
        style: FontStyle,
    ) -> Result<EmbeddedFont, FontError> {
        let full_path = self.resolve(path.as_ref());
        let display = full_path.display().to_string();

        let extension = full_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(FontError::UnsupportedFormat(display));
        }

        let data = std::fs::read(&full_path).map_err(|e| FontError::LoadFailed {
            path: display.clone(),
            message: e.to_string(),
        })?;

        let family = match family {
            Some(f) => f.to_string(),
            None => family_name(&data).ok_or_else(|| FontError::LoadFailed {
                path: display.clone(),
                message: "no family name in font".to_string(),
            })?,
        };

        log::debug!("Loaded font '{}' ({} {}) from {}", family, weight, style, display);
        Ok(EmbeddedFont::new(family, weight, style, Arc::new(data)))
    }
}

/// Reads the family name (name ID 1) from raw font data.
pub fn family_name(data: &[u8]) -> Option<String> {
    let face = ttf_parser::Face::parse(data, 0).ok()?;
    face.names()
        .into_iter()
        .filter(|n| n.name_id == ttf_parser::name_id::FAMILY)
        .find_map(|n| n.to_string())
}
