//! Widget appearance streams and the final normalization pass over every
//! widget in the form.

use crate::error::PdfError;
use crate::fonts::FormFont;
use crate::form::TextFieldFlags;
use crate::page::{is_name, number, resolve};
use crate::text::{decode_text_string, encode_win_ansi, format_number};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use mdforge_types::{Color, Rect};
use std::collections::HashSet;

/// Inner padding between the widget edge and its text.
const TEXT_PADDING: f32 = 2.0;
/// Bezier control point distance for a quarter circle.
const CIRCLE_KAPPA: f32 = 0.552_284_7;
/// Parent chains deeper than this are treated as malformed.
const MAX_FIELD_DEPTH: usize = 32;

fn real(v: f32) -> Object {
    Object::Real(v.into())
}

fn op(operator: &str, operands: Vec<Object>) -> Operation {
    Operation::new(operator, operands)
}

fn fill_color(color: Color) -> Operation {
    op("rg", color.components().iter().map(|&c| real(c)).collect())
}

fn stroke_color(color: Color) -> Operation {
    op("RG", color.components().iter().map(|&c| real(c)).collect())
}

/// Wraps operations into a form XObject sized to the widget.
fn form_xobject(
    doc: &mut Document,
    rect: Rect,
    operations: Vec<Operation>,
    resources: Dictionary,
) -> Result<ObjectId, lopdf::Error> {
    let content = Content { operations }.encode()?;
    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![real(0.0), real(0.0), real(rect.width), real(rect.height)],
            "Resources" => resources,
        },
        content,
    );
    Ok(doc.add_object(stream))
}

/// Font size used when the field says "auto" (`0 Tf`).
pub fn auto_font_size(rect: Rect) -> f32 {
    ((rect.height - 2.0 * TEXT_PADDING) * 0.75).clamp(4.0, 12.0)
}

fn text_operations(rect: Rect, text: &str, font_name: &str, size: f32, multiline: bool) -> Vec<Operation> {
    let mut ops = vec![op("BMC", vec![Object::Name(b"Tx".to_vec())])];
    if text.is_empty() {
        ops.push(op("EMC", vec![]));
        return ops;
    }

    ops.extend([
        op("q", vec![]),
        op("re", vec![real(1.0), real(1.0), real(rect.width - 2.0), real(rect.height - 2.0)]),
        op("W", vec![]),
        op("n", vec![]),
        op("BT", vec![]),
        op("Tf", vec![Object::Name(font_name.as_bytes().to_vec()), real(size)]),
        fill_color(Color::BLACK),
    ]);

    if multiline {
        let leading = size * 1.2;
        ops.push(op("TL", vec![real(leading)]));
        ops.push(op("Td", vec![real(TEXT_PADDING), real(rect.height - TEXT_PADDING - size)]));
        for (i, line) in text.lines().enumerate() {
            if i > 0 {
                ops.push(op("T*", vec![]));
            }
            ops.push(op("Tj", vec![Object::String(encode_win_ansi(line), StringFormat::Literal)]));
        }
    } else {
        let baseline = (rect.height - size) / 2.0 + size * 0.22;
        ops.push(op("Td", vec![real(TEXT_PADDING), real(baseline)]));
        let line = text.lines().next().unwrap_or_default();
        ops.push(op("Tj", vec![Object::String(encode_win_ansi(line), StringFormat::Literal)]));
    }

    ops.extend([op("ET", vec![]), op("Q", vec![]), op("EMC", vec![])]);
    ops
}

/// Normal appearance of a text or choice widget showing `text`.
///
/// A `size` of `None` or `0` selects [`auto_font_size`].
pub(crate) fn text_appearance(
    doc: &mut Document,
    rect: Rect,
    text: &str,
    font: &FormFont,
    size: Option<f32>,
    multiline: bool,
) -> Result<ObjectId, lopdf::Error> {
    let size = size.filter(|s| *s > 0.0).unwrap_or_else(|| auto_font_size(rect));
    let ops = text_operations(rect, text, &font.resource_name, size, multiline);
    let mut fonts = Dictionary::new();
    fonts.set(font.resource_name.as_str(), font.font_id);
    form_xobject(doc, rect, ops, dictionary! { "Font" => fonts })
}

/// `(on, off)` appearances of a checkbox: a stroked check mark, and nothing.
pub(crate) fn checkbox_appearances(doc: &mut Document, rect: Rect) -> Result<(ObjectId, ObjectId), lopdf::Error> {
    let (w, h) = (rect.width, rect.height);
    let margin = w * 0.2;
    let on = vec![
        op("q", vec![]),
        stroke_color(Color::BLACK),
        op("w", vec![real(w * 0.1)]),
        op("m", vec![real(margin), real(h * 0.5)]),
        op("l", vec![real(w * 0.4), real(margin)]),
        op("l", vec![real(w - margin), real(h - margin)]),
        op("S", vec![]),
        op("Q", vec![]),
    ];
    let on_id = form_xobject(doc, rect, on, Dictionary::new())?;
    let off_id = form_xobject(doc, rect, Vec::new(), Dictionary::new())?;
    Ok((on_id, off_id))
}

fn circle(cx: f32, cy: f32, r: f32) -> Vec<Operation> {
    let k = r * CIRCLE_KAPPA;
    let curve = |pts: [f32; 6]| op("c", pts.iter().map(|&v| real(v)).collect());
    vec![
        op("m", vec![real(cx + r), real(cy)]),
        curve([cx + r, cy + k, cx + k, cy + r, cx, cy + r]),
        curve([cx - k, cy + r, cx - r, cy + k, cx - r, cy]),
        curve([cx - r, cy - k, cx - k, cy - r, cx, cy - r]),
        curve([cx + k, cy - r, cx + r, cy - k, cx + r, cy]),
    ]
}

/// `(on, off)` appearances of a radio option: a filled dot, and nothing.
pub(crate) fn radio_appearances(doc: &mut Document, rect: Rect) -> Result<(ObjectId, ObjectId), lopdf::Error> {
    let (cx, cy) = (rect.width / 2.0, rect.height / 2.0);
    let radius = (rect.width.min(rect.height) / 2.0 - 1.0).max(0.5);

    let mut on = vec![op("q", vec![]), fill_color(Color::BLACK)];
    on.extend(circle(cx, cy, radius * 0.5));
    on.extend([op("f", vec![]), op("Q", vec![])]);

    let on_id = form_xobject(doc, rect, on, Dictionary::new())?;
    let off_id = form_xobject(doc, rect, Vec::new(), Dictionary::new())?;
    Ok((on_id, off_id))
}

/// A widget annotation and the terminal field that owns its value.
#[derive(Debug, Clone)]
struct WidgetRef {
    widget_id: ObjectId,
    field_id: ObjectId,
    field_type: Option<Vec<u8>>,
}

fn visit_field(
    doc: &Document,
    node_id: ObjectId,
    inherited_type: Option<Vec<u8>>,
    parent_field: Option<ObjectId>,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<WidgetRef>,
) {
    if !visited.insert(node_id) {
        return;
    }
    let Ok(dict) = doc.get_object(node_id).and_then(Object::as_dict) else {
        return;
    };

    let field_type = match dict.get(b"FT") {
        Ok(Object::Name(name)) => Some(name.clone()),
        _ => inherited_type,
    };
    let field_id = if dict.has(b"T") { node_id } else { parent_field.unwrap_or(node_id) };

    if dict.get(b"Subtype").map(|s| is_name(s, b"Widget")).unwrap_or(false) {
        out.push(WidgetRef { widget_id: node_id, field_id, field_type: field_type.clone() });
    }

    if let Some(kids) = dict.get(b"Kids").ok().and_then(|k| resolve(doc, k)).and_then(|k| k.as_array().ok()) {
        for kid in kids {
            if let Object::Reference(kid_id) = kid {
                visit_field(doc, *kid_id, field_type.clone(), Some(field_id), visited, out);
            }
        }
    }
}

/// Every widget reachable from the form's `/Fields`, in tree order.
fn collect_widgets(doc: &Document, acroform_id: ObjectId) -> Vec<WidgetRef> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    let fields = doc
        .get_object(acroform_id)
        .and_then(Object::as_dict)
        .ok()
        .and_then(|form| form.get(b"Fields").ok())
        .and_then(|f| resolve(doc, f))
        .and_then(|f| f.as_array().ok())
        .cloned()
        .unwrap_or_default();

    for field in fields {
        if let Object::Reference(id) = field {
            visit_field(doc, id, None, None, &mut visited, &mut out);
        }
    }
    out
}

/// Looks up a field attribute, walking `/Parent` for inheritable keys.
fn inherited<'a>(doc: &'a Document, field_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = field_id;
    for _ in 0..MAX_FIELD_DEPTH {
        let dict = doc.get_object(current).and_then(Object::as_dict).ok()?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// The font size named in a `/DA` string, if any.
pub fn parse_da_font_size(da: &str) -> Option<f32> {
    let tokens: Vec<&str> = da.split_whitespace().collect();
    let tf = tokens.iter().position(|t| *t == "Tf")?;
    tokens.get(tf.checked_sub(1)?)?.parse().ok()
}

fn field_value(doc: &Document, field_id: ObjectId) -> String {
    match inherited(doc, field_id, b"V") {
        Some(Object::String(bytes, _)) => decode_text_string(bytes),
        Some(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
        Some(Object::Array(items)) => items
            .iter()
            .find_map(|item| match item {
                Object::String(bytes, _) => Some(decode_text_string(bytes)),
                _ => None,
            })
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Switches every text and choice widget to `font` and redraws its normal
/// appearance with the field's current value. Returns the number of widgets
/// redrawn.
///
/// The font must already be registered in the form's default resources.
pub fn update_field_appearances(
    doc: &mut Document,
    acroform_id: ObjectId,
    font: &FormFont,
) -> Result<usize, PdfError> {
    let mut updated = 0;

    for widget in collect_widgets(doc, acroform_id) {
        let is_text = matches!(widget.field_type.as_deref(), Some(b"Tx"));
        let is_choice = matches!(widget.field_type.as_deref(), Some(b"Ch"));
        if !is_text && !is_choice {
            continue;
        }

        let Some(rect) = doc
            .get_object(widget.widget_id)
            .and_then(Object::as_dict)
            .ok()
            .and_then(|w| w.get(b"Rect").ok())
            .and_then(|r| crate::page::rect_from_object(doc, r))
        else {
            continue;
        };

        let size = match inherited(doc, widget.field_id, b"DA") {
            Some(Object::String(bytes, _)) => parse_da_font_size(&String::from_utf8_lossy(bytes)),
            _ => None,
        }
        .unwrap_or(0.0);
        let multiline = is_text
            && inherited(doc, widget.field_id, b"Ff")
                .and_then(number)
                .map(|ff| TextFieldFlags::from_bits_truncate(ff as u32).contains(TextFieldFlags::MULTILINE))
                .unwrap_or(false);
        let value = field_value(doc, widget.field_id);

        let appearance = text_appearance(doc, rect, &value, font, Some(size), multiline)?;
        let da = Object::string_literal(format!("/{} {} Tf 0 g", font.resource_name, format_number(size)));

        doc.get_object_mut(widget.field_id)?.as_dict_mut()?.set("DA", da.clone());
        let widget_dict = doc.get_object_mut(widget.widget_id)?.as_dict_mut()?;
        if widget.widget_id != widget.field_id && widget_dict.has(b"DA") {
            widget_dict.set("DA", da);
        }
        widget_dict.set("AP", dictionary! { "N" => appearance });
        updated += 1;
    }

    log::debug!("Regenerated {} text/choice appearances with '{}'", updated, font.resource_name);
    Ok(updated)
}

/// Deletes `/BG` from the `/MK` dictionary of every widget in the form,
/// including widgets that existed before synthesis. Returns how many
/// backgrounds were removed.
pub fn strip_widget_backgrounds(doc: &mut Document, acroform_id: ObjectId) -> Result<usize, PdfError> {
    let mut stripped = 0;

    for widget in collect_widgets(doc, acroform_id) {
        let mk = doc.get_object(widget.widget_id)?.as_dict()?.get(b"MK").ok().cloned();
        let removed = match mk {
            Some(Object::Reference(mk_id)) => doc
                .get_object_mut(mk_id)
                .and_then(Object::as_dict_mut)
                .map(|mk| mk.remove(b"BG").is_some())
                .unwrap_or(false),
            Some(Object::Dictionary(_)) => {
                let widget_dict = doc.get_object_mut(widget.widget_id)?.as_dict_mut()?;
                match widget_dict.get_mut(b"MK") {
                    Ok(Object::Dictionary(mk)) => mk.remove(b"BG").is_some(),
                    _ => false,
                }
            }
            _ => false,
        };
        if removed {
            stripped += 1;
        }
    }

    Ok(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helvetica(doc: &mut Document) -> FormFont {
        let font_id = doc.add_object(crate::fonts::standard_font("Helvetica"));
        FormFont { resource_name: "Helv".to_string(), font_id, family: None }
    }

    fn stream_text(doc: &Document, id: ObjectId) -> String {
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        String::from_utf8_lossy(&stream.content).into_owned()
    }

    #[test]
    fn da_size_is_parsed() {
        assert_eq!(parse_da_font_size("/Helv 12 Tf 0 g"), Some(12.0));
        assert_eq!(parse_da_font_size("/Inter-Regular 0 Tf 0 g"), Some(0.0));
        assert_eq!(parse_da_font_size("0 g"), None);
        assert_eq!(parse_da_font_size("Tf"), None);
    }

    #[test]
    fn empty_text_appearance_is_marked_content_only() {
        let mut doc = Document::with_version("1.7");
        let font = helvetica(&mut doc);
        let id = text_appearance(&mut doc, Rect::new(0.0, 0.0, 100.0, 20.0), "", &font, Some(12.0), false).unwrap();
        let text = stream_text(&doc, id);
        assert!(text.contains("/Tx BMC"));
        assert!(!text.contains("BT"));
    }

    #[test]
    fn text_appearance_uses_named_font() {
        let mut doc = Document::with_version("1.7");
        let font = helvetica(&mut doc);
        let id = text_appearance(&mut doc, Rect::new(0.0, 0.0, 100.0, 40.0), "a\nb", &font, None, true).unwrap();
        let text = stream_text(&doc, id);
        assert!(text.contains("/Helv"));
        assert!(text.contains("T*"));

        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        let resources = stream.dict.get(b"Resources").unwrap().as_dict().unwrap();
        assert!(resources.get(b"Font").unwrap().as_dict().unwrap().has(b"Helv"));
    }

    #[test]
    fn auto_size_stays_readable() {
        assert_eq!(auto_font_size(Rect::new(0.0, 0.0, 100.0, 40.0)), 12.0);
        assert_eq!(auto_font_size(Rect::new(0.0, 0.0, 100.0, 4.0)), 4.0);
    }

    #[test]
    fn backgrounds_are_stripped_inline_and_indirect() {
        let mut doc = Document::with_version("1.7");
        let indirect_mk = doc.add_object(dictionary! { "BG" => vec![real(1.0)] });
        let kid = doc.add_object(dictionary! {
            "Subtype" => "Widget",
            "MK" => indirect_mk,
        });
        let parent = doc.add_object(dictionary! {
            "FT" => "Btn",
            "T" => Object::string_literal("choice"),
            "Kids" => vec![Object::Reference(kid)],
        });
        let merged = doc.add_object(dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal("name"),
            "Subtype" => "Widget",
            "MK" => dictionary! { "BG" => vec![real(1.0)], "BC" => vec![real(0.0)] },
        });
        let form = doc.add_object(dictionary! {
            "Fields" => vec![Object::Reference(parent), Object::Reference(merged)],
        });

        assert_eq!(strip_widget_backgrounds(&mut doc, form).unwrap(), 2);

        let mk = doc.get_object(indirect_mk).unwrap().as_dict().unwrap();
        assert!(!mk.has(b"BG"));
        let merged_mk = doc.get_object(merged).unwrap().as_dict().unwrap().get(b"MK").unwrap().as_dict().unwrap();
        assert!(!merged_mk.has(b"BG"));
        assert!(merged_mk.has(b"BC"));
    }
}
