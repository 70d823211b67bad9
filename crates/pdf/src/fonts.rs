//! Choosing and embedding the face used by form field appearances.

use crate::error::PdfError;
use crate::text::win_ansi_char;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use mdforge_types::{EmbeddedFont, FontStyle, REGULAR_WEIGHT};

/// CSS pixels are 1/96 in, PDF points 1/72 in.
pub const CSS_PX_TO_PT: f32 = 0.75;

/// Resource name of the built-in Helvetica form font.
pub const DEFAULT_FONT_NAME: &str = "Helv";

/// Resource name of ZapfDingbats, used by checkbox `/DA` strings.
pub const SYMBOL_FONT_NAME: &str = "ZaDb";

const FIRST_CHAR: u8 = 32;
const LAST_CHAR: u8 = 255;

/// Converts a rendered CSS pixel size into the form font size in points.
pub fn form_font_size(px: f32) -> f32 {
    (px * CSS_PX_TO_PT).round()
}

/// Picks the face to embed.
///
/// Preference: the requested family at regular weight and normal style,
/// then any regular face, then whatever comes first.
pub fn select_font<'a>(family: Option<&str>, candidates: &'a [EmbeddedFont]) -> Option<&'a EmbeddedFont> {
    family
        .and_then(|family| {
            candidates
                .iter()
                .find(|f| f.family == family && f.is_regular())
        })
        .or_else(|| candidates.iter().find(|f| f.is_regular()))
        .or_else(|| candidates.first())
}

/// A font registered in the form's default resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFont {
    /// Key under `/DR /Font`, used in `/DA` strings.
    pub resource_name: String,
    pub font_id: ObjectId,
    /// Family of the embedded face; `None` for the built-in Helvetica.
    pub family: Option<String>,
}

/// A standard-14 font dictionary with WinAnsiEncoding.
pub(crate) fn standard_font(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn postscript_name(face: &ttf_parser::Face<'_>) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
        .find_map(|n| n.to_string())
}

/// Keeps only characters that are safe in a PDF name without escaping.
fn sanitize_name(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-').collect()
}

/// Embeds a face as a simple TrueType font.
///
/// TrueType outlines go into `/FontFile2`, CFF outlines into `/FontFile3`
/// with subtype `/OpenType`. Glyph widths cover codes 32 through 255 under
/// WinAnsiEncoding.
///
/// # Errors
///
/// `PdfError::Font` when the bytes are not a parseable font.
pub fn embed_font(doc: &mut Document, font: &EmbeddedFont) -> Result<FormFont, PdfError> {
    let face = ttf_parser::Face::parse(&font.data, 0)
        .map_err(|e| PdfError::Font(format!("{}: {}", font.family, e)))?;

    let base_name = postscript_name(&face)
        .map(|n| sanitize_name(&n))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| sanitize_name(&font.family));
    let base_name = if base_name.is_empty() { "FormFont".to_string() } else { base_name };

    let scale = 1000.0 / face.units_per_em() as f32;
    let scaled = |v: i16| Object::Integer((v as f32 * scale).round() as i64);

    let widths: Vec<Object> = (FIRST_CHAR..=LAST_CHAR)
        .map(|code| {
            let advance = win_ansi_char(code)
                .and_then(|c| face.glyph_index(c))
                .and_then(|g| face.glyph_hor_advance(g))
                .unwrap_or(0);
            Object::Integer((advance as f32 * scale).round() as i64)
        })
        .collect();

    let is_cff = face.tables().cff.is_some();
    let data = font.data.as_ref().clone();
    let (file_key, file_stream) = if is_cff {
        ("FontFile3", Stream::new(dictionary! { "Subtype" => "OpenType" }, data))
    } else {
        let length = data.len() as i64;
        ("FontFile2", Stream::new(dictionary! { "Length1" => length }, data))
    };
    let file_id = doc.add_object(file_stream);

    let italic = font.style != FontStyle::Normal || face.is_italic();
    let mut flags: i64 = 32; // Nonsymbolic
    if face.is_monospaced() {
        flags |= 1;
    }
    if italic {
        flags |= 64;
    }

    let bbox = face.global_bounding_box();
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(base_name.clone().into_bytes()),
        "FontFamily" => Object::string_literal(font.family.as_str()),
        "Flags" => flags,
        "FontBBox" => vec![scaled(bbox.x_min), scaled(bbox.y_min), scaled(bbox.x_max), scaled(bbox.y_max)],
        "ItalicAngle" => if italic { -12 } else { 0 },
        "Ascent" => scaled(face.ascender()),
        "Descent" => scaled(face.descender()),
        "CapHeight" => scaled(face.capital_height().unwrap_or(face.ascender())),
        "StemV" => if font.weight > REGULAR_WEIGHT { 120 } else { 80 },
        file_key => file_id,
    });

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => Object::Name(base_name.clone().into_bytes()),
        "FirstChar" => FIRST_CHAR as i64,
        "LastChar" => LAST_CHAR as i64,
        "Widths" => widths,
        "FontDescriptor" => descriptor_id,
        "Encoding" => "WinAnsiEncoding",
    });

    log::debug!(
        "Embedded form font '{}' as {} ({} bytes, {})",
        font.family,
        base_name,
        font.data.len(),
        file_key
    );

    Ok(FormFont {
        resource_name: base_name,
        font_id,
        family: Some(font.family.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn face(family: &str, weight: u16, style: FontStyle) -> EmbeddedFont {
        EmbeddedFont::new(family, weight, style, Arc::new(Vec::new()))
    }

    #[test]
    fn pixel_sizes_convert_to_points() {
        assert_eq!(form_font_size(16.0), 12.0);
        assert_eq!(form_font_size(14.0), 11.0);
        assert_eq!(form_font_size(13.0), 10.0);
    }

    #[test]
    fn exact_regular_face_wins() {
        let fonts = vec![
            face("Inter", 700, FontStyle::Normal),
            face("Roboto", 400, FontStyle::Normal),
            face("Inter", 400, FontStyle::Normal),
        ];
        let chosen = select_font(Some("Inter"), &fonts).unwrap();
        assert_eq!((chosen.family.as_str(), chosen.weight), ("Inter", 400));
    }

    #[test]
    fn falls_back_to_any_regular_then_first() {
        let fonts = vec![face("Inter", 700, FontStyle::Normal), face("Roboto", 400, FontStyle::Normal)];
        assert_eq!(select_font(Some("Lato"), &fonts).unwrap().family, "Roboto");
        assert_eq!(select_font(None, &fonts).unwrap().family, "Roboto");

        let fonts = vec![face("Inter", 700, FontStyle::Italic), face("Inter", 300, FontStyle::Normal)];
        assert_eq!(select_font(Some("Inter"), &fonts).unwrap().weight, 700);
        assert!(select_font(Some("Inter"), &[]).is_none());
    }

    #[test]
    fn unparseable_font_is_an_error() {
        let mut doc = Document::with_version("1.7");
        let result = embed_font(&mut doc, &face("Broken", 400, FontStyle::Normal));
        assert!(matches!(result, Err(PdfError::Font(_))));
        assert!(doc.objects.is_empty());
    }

    #[test]
    fn truetype_face_embeds_as_font_file2() {
        let data = include_bytes!("../../../tests/fixtures/fonts/Tuffy.ttf").to_vec();
        let font = EmbeddedFont::new("Tuffy", 400, FontStyle::Normal, Arc::new(data));
        let mut doc = Document::with_version("1.7");

        let embedded = embed_font(&mut doc, &font).unwrap();

        assert_eq!(embedded.family.as_deref(), Some("Tuffy"));
        assert!(!embedded.resource_name.is_empty());
        let dict = doc.get_dictionary(embedded.font_id).unwrap();
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"TrueType");
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), embedded.resource_name.as_bytes());
        assert_eq!(dict.get(b"Encoding").unwrap().as_name().unwrap(), b"WinAnsiEncoding");

        let widths = dict.get(b"Widths").unwrap().as_array().unwrap();
        assert_eq!(widths.len(), 224);
        // The space glyph has a real advance.
        assert!(widths[0].as_i64().unwrap() > 0);

        let descriptor_id = dict.get(b"FontDescriptor").unwrap().as_reference().unwrap();
        let descriptor = doc.get_dictionary(descriptor_id).unwrap();
        assert!(descriptor.get(b"FontFile3").is_err());
        let file_id = descriptor.get(b"FontFile2").unwrap().as_reference().unwrap();
        let file = doc.get_object(file_id).unwrap().as_stream().unwrap();
        assert_eq!(file.dict.get(b"Length1").unwrap().as_i64().unwrap(), font.data.len() as i64);
    }
}
