//! Page-level drawing: the dropdown arrow that combo boxes lack in print,
//! appended to page content without disturbing the existing graphics state.

use crate::error::PdfError;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use mdforge_types::Rect;
use std::collections::BTreeMap;

/// Font size assumed for arrow sizing when none was observed.
pub const DEFAULT_ARROW_FONT_SIZE: f32 = 12.0;
/// Gap between the arrow and the right edge of the field.
pub const ARROW_RIGHT_PADDING: f32 = 4.0;

/// A downward-pointing triangle. `y` is the top edge; the tip sits `height`
/// below it, centered horizontally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropdownArrow {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DropdownArrow {
    /// Sizes and places the arrow inside a select field's rectangle.
    pub fn for_field(rect: Rect, font_size: Option<f32>) -> Self {
        let font_size = font_size.unwrap_or(DEFAULT_ARROW_FONT_SIZE);
        let width = (font_size * 0.6).min(rect.height * 0.3);
        let height = width * 0.6;
        Self {
            x: rect.right() - ARROW_RIGHT_PADDING - width,
            y: rect.y + (rect.height + height) / 2.0,
            width,
            height,
        }
    }

    pub fn operations(&self) -> Vec<Operation> {
        let real = |v: f32| Object::Real(v.into());
        vec![
            Operation::new("q", vec![]),
            Operation::new("rg", vec![real(0.0), real(0.0), real(0.0)]),
            Operation::new("m", vec![real(self.x), real(self.y)]),
            Operation::new("l", vec![real(self.x + self.width), real(self.y)]),
            Operation::new("l", vec![real(self.x + self.width / 2.0), real(self.y - self.height)]),
            Operation::new("h", vec![]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]
    }
}

/// Drawing collected per page and written as one new content stream each.
#[derive(Debug, Default)]
pub struct PageOverlays {
    pending: BTreeMap<ObjectId, Vec<Operation>>,
}

impl PageOverlays {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, page_id: ObjectId, operations: Vec<Operation>) {
        self.pending.entry(page_id).or_default().extend(operations);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Encodes and appends every pending overlay to its page.
    pub fn apply(self, doc: &mut Document) -> Result<(), PdfError> {
        for (page_id, operations) in self.pending {
            let content = Content { operations }.encode()?;
            overlay_content(doc, page_id, content)?;
        }
        Ok(())
    }
}

/// Appends a content stream to a page so it is drawn on top.
///
/// Existing content is bracketed in `q`/`Q` first so a transform or color
/// left set by the page cannot leak into the overlay.
pub fn overlay_content(doc: &mut Document, page_id: ObjectId, content_stream: Vec<u8>) -> Result<(), PdfError> {
    let existing = doc.get_object(page_id)?.as_dict()?.get(b"Contents").ok().cloned();
    let mut contents = match existing {
        None => Vec::new(),
        Some(Object::Array(items)) => items,
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(other) => vec![other],
    };

    if !contents.is_empty() {
        let save = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let restore = doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()));
        contents.insert(0, Object::Reference(save));
        contents.push(Object::Reference(restore));
    }

    let overlay_id = doc.add_object(Stream::new(dictionary! {}, content_stream));
    contents.push(Object::Reference(overlay_id));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}
