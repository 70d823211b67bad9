//! Page tree and annotation array plumbing shared by extraction and field
//! creation.

use lopdf::{Document, Object, ObjectId};
use mdforge_types::Rect;

/// Page object ids in document order.
pub(crate) fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Follows one level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

pub(crate) fn is_name(obj: &Object, expected: &[u8]) -> bool {
    matches!(obj, Object::Name(name) if name.as_slice() == expected)
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Reads a `/Rect` array into a normalized rectangle.
pub(crate) fn rect_from_object(doc: &Document, obj: &Object) -> Option<Rect> {
    let values = resolve(doc, obj)?.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut corners = [0.0f32; 4];
    for (slot, value) in corners.iter_mut().zip(values) {
        *slot = number(resolve(doc, value)?)?;
    }
    Some(Rect::from_corners(corners[0], corners[1], corners[2], corners[3]))
}

pub(crate) fn rect_array(rect: Rect) -> Object {
    Object::Array(rect.corners().iter().map(|&v| Object::Real(v.into())).collect())
}

/// Where a page keeps its `/Annots` array.
enum AnnotsLocation {
    Missing,
    Inline,
    Indirect(ObjectId),
}

fn annots_location(doc: &Document, page_id: ObjectId) -> Result<AnnotsLocation, lopdf::Error> {
    let page = doc.get_object(page_id)?.as_dict()?;
    Ok(match page.get(b"Annots") {
        Ok(Object::Reference(id)) => AnnotsLocation::Indirect(*id),
        Ok(_) => AnnotsLocation::Inline,
        Err(_) => AnnotsLocation::Missing,
    })
}

/// The entries of a page's `/Annots` array, usually references.
pub(crate) fn page_annotations(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, lopdf::Error> {
    let page = doc.get_object(page_id)?.as_dict()?;
    let annots = match page.get(b"Annots") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };
    Ok(resolve(doc, annots)
        .and_then(|obj| obj.as_array().ok())
        .cloned()
        .unwrap_or_default())
}

/// Replaces a page's annotations, keeping an indirect array indirect. An
/// empty list removes `/Annots` from the page.
pub(crate) fn set_page_annotations(
    doc: &mut Document,
    page_id: ObjectId,
    annots: Vec<Object>,
) -> Result<(), lopdf::Error> {
    match annots_location(doc, page_id)? {
        AnnotsLocation::Indirect(array_id) if !annots.is_empty() => {
            *doc.get_object_mut(array_id)? = Object::Array(annots);
        }
        location => {
            if let AnnotsLocation::Indirect(array_id) = location {
                doc.objects.remove(&array_id);
            }
            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            if annots.is_empty() {
                page.remove(b"Annots");
            } else {
                page.set("Annots", Object::Array(annots));
            }
        }
    }
    Ok(())
}

/// Appends one annotation reference to a page.
pub(crate) fn push_page_annotation(
    doc: &mut Document,
    page_id: ObjectId,
    annot_id: ObjectId,
) -> Result<(), lopdf::Error> {
    let mut annots = page_annotations(doc, page_id)?;
    annots.push(Object::Reference(annot_id));
    set_page_annotations(doc, page_id, annots)
}
