//! System font lookup backed by fontdb.
//!
//! Used when the rendered page reports a font family but no embeddable font
//! bytes were supplied for it.

use mdforge_traits::{FontError, FontQuery, FontSource};
use mdforge_types::{EmbeddedFont, FontStyle};
use std::sync::Arc;

/// Finds installed faces through a fontdb database.
#[derive(Debug)]
pub struct SystemFontSource {
    db: fontdb::Database,
}

impl SystemFontSource {
    /// Scans the platform's font directories.
    pub fn new() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        log::debug!("SystemFontSource loaded {} faces", db.len());
        Self { db }
    }

    /// Wraps an already populated database.
    pub fn from_database(db: fontdb::Database) -> Self {
        Self { db }
    }
}

impl Default for SystemFontSource {
    fn default() -> Self {
        Self::new()
    }
}

fn map_style(style: FontStyle) -> fontdb::Style {
    match style {
        FontStyle::Normal => fontdb::Style::Normal,
        FontStyle::Italic => fontdb::Style::Italic,
        FontStyle::Oblique => fontdb::Style::Oblique,
    }
}

impl FontSource for SystemFontSource {
    fn find_font(&self, query: &FontQuery<'_>) -> Result<EmbeddedFont, FontError> {
        let not_found = || FontError::NotFound {
            family: query.family.to_string(),
            weight: query.weight,
            style: query.style,
        };

        let id = self
            .db
            .query(&fontdb::Query {
                families: &[fontdb::Family::Name(query.family), fontdb::Family::SansSerif],
                weight: fontdb::Weight(query.weight),
                stretch: fontdb::Stretch::Normal,
                style: map_style(query.style),
            })
            .ok_or_else(not_found)?;

        let face = self.db.face(id).ok_or_else(not_found)?;
        let family = face
            .families
            .first()
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| query.family.to_string());

        // Collections (.ttc) cannot be embedded as a single FontFile2 stream.
        if face.index != 0 {
            return Err(FontError::UnsupportedFormat(format!("{} (collection member)", family)));
        }

        let data = self
            .db
            .with_face_data(id, |data, _| data.to_vec())
            .ok_or_else(|| FontError::LoadFailed {
                path: family.clone(),
                message: "face data unavailable".to_string(),
            })?;

        log::info!("Resolved system font '{}' for requested family '{}'", family, query.family);
        Ok(EmbeddedFont::new(family, face.weight.0, query.style, Arc::new(data)))
    }

    fn name(&self) -> &'static str {
        "SystemFontSource"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_database_finds_nothing() {
        let source = SystemFontSource::from_database(fontdb::Database::new());
        let result = source.find_font(&FontQuery::new("Inter"));
        assert!(matches!(result, Err(FontError::NotFound { .. })));
    }
}
