//! Finds marker link annotations, turns them into [`FieldPosition`]s and
//! strips them from the document.

use crate::error::PdfError;
use crate::marker::{self, MarkerInfo};
use crate::page::{is_name, page_annotations, page_ids, rect_from_object, resolve, set_page_annotations};
use crate::text::decode_text_string;
use lopdf::{Document, Object};
use mdforge_types::{FieldPosition, Rect};

/// Reads a marker out of one `/Annots` entry, if it is one.
fn marker_from_annotation(doc: &Document, annot: &Object) -> Option<(MarkerInfo, Rect)> {
    let dict = resolve(doc, annot)?.as_dict().ok()?;
    if !is_name(dict.get(b"Subtype").ok()?, b"Link") {
        return None;
    }

    let action = resolve(doc, dict.get(b"A").ok()?)?.as_dict().ok()?;
    if !is_name(action.get(b"S").ok()?, b"URI") {
        return None;
    }
    let uri = match resolve(doc, action.get(b"URI").ok()?)? {
        Object::String(bytes, _) => decode_text_string(bytes),
        _ => return None,
    };

    let info = marker::decode(&uri)?;
    let rect = rect_from_object(doc, dict.get(b"Rect").ok()?)?;
    Some((info, rect))
}

/// Collects every marker annotation in page order and removes it from its
/// page.
///
/// Only the page's `/Annots` entry is dropped. The annotation object itself
/// stays in the object table because tagged PDFs reference link annotations
/// from `/StructTreeRoot` (`/OBJR` entries and the parent tree). Ordinary
/// links are left alone.
pub fn extract_and_remove_markers(doc: &mut Document) -> Result<Vec<FieldPosition>, PdfError> {
    let mut fields = Vec::new();

    for (page_index, page_id) in page_ids(doc).into_iter().enumerate() {
        let annots = page_annotations(doc, page_id)?;
        if annots.is_empty() {
            continue;
        }

        let mut kept = Vec::with_capacity(annots.len());
        let mut removed = 0;
        for annot in annots {
            match marker_from_annotation(doc, &annot) {
                Some((info, rect)) => {
                    log::debug!(
                        "Marker '{}' ({}) on page {} at {:?}",
                        info.name,
                        info.kind,
                        page_index,
                        rect
                    );
                    let mut field = FieldPosition::new(info.name, info.kind, rect, page_index);
                    field.value = info.value;
                    fields.push(field);
                    removed += 1;
                }
                None => kept.push(annot),
            }
        }

        if removed == 0 {
            continue;
        }
        set_page_annotations(doc, page_id, kept)?;
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, ObjectId, StringFormat, dictionary};
    use mdforge_types::FieldKind;

    fn link(doc: &mut Document, uri: &str, rect: [i64; 4]) -> ObjectId {
        doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
            "A" => dictionary! {
                "S" => "URI",
                "URI" => Object::String(uri.as_bytes().to_vec(), StringFormat::Literal),
            },
        })
    }

    fn two_page_doc() -> (Document, Vec<ObjectId>) {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for _ in 0..2 {
            kids.push(doc.add_object(dictionary! { "Type" => "Page", "Parent" => pages_id }));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
                "Count" => 2,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        (doc, kids)
    }

    fn set_annots(doc: &mut Document, page_id: ObjectId, annots: Vec<ObjectId>) {
        let page: &mut Dictionary = doc.get_object_mut(page_id).unwrap().as_dict_mut().unwrap();
        page.set("Annots", annots.into_iter().map(Object::Reference).collect::<Vec<_>>());
    }

    #[test]
    fn markers_are_extracted_and_removed() {
        let (mut doc, pages) = two_page_doc();
        let email = link(&mut doc, &marker::encode("email", FieldKind::Text, None), [100, 200, 220, 220]);
        let site = link(&mut doc, "https://example.com/", [10, 10, 50, 20]);
        let yes = link(&mut doc, &marker::encode("agree", FieldKind::Checkbox, Some("yes")), [40, 60, 52, 72]);
        set_annots(&mut doc, pages[0], vec![email, site]);
        set_annots(&mut doc, pages[1], vec![yes]);

        let fields = extract_and_remove_markers(&mut doc).unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "email");
        assert_eq!(fields[0].rect, Rect::new(100.0, 200.0, 120.0, 20.0));
        assert_eq!(fields[0].page_index, 0);
        assert_eq!(fields[1].value.as_deref(), Some("yes"));
        assert_eq!(fields[1].page_index, 1);

        let remaining = page_annotations(&doc, pages[0]).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].as_reference().unwrap(), site);
        assert!(!doc.get_object(pages[1]).unwrap().as_dict().unwrap().has(b"Annots"));
        assert!(doc.get_object(site).is_ok());
    }

    #[test]
    fn structure_tree_references_stay_valid() {
        let (mut doc, pages) = two_page_doc();
        let email = link(&mut doc, &marker::encode("email", FieldKind::Text, None), [100, 200, 220, 220]);
        set_annots(&mut doc, pages[0], vec![email]);
        let link_elem = doc.add_object(dictionary! {
            "Type" => "StructElem",
            "S" => "Link",
            "Pg" => pages[0],
            "K" => dictionary! { "Type" => "OBJR", "Obj" => email, "Pg" => pages[0] },
        });
        let struct_root = doc.add_object(dictionary! {
            "Type" => "StructTreeRoot",
            "K" => link_elem,
            "ParentTree" => dictionary! { "Nums" => vec![0.into(), Object::Reference(link_elem)] },
        });
        let catalog = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        doc.get_object_mut(catalog).unwrap().as_dict_mut().unwrap().set("StructTreeRoot", struct_root);

        let fields = extract_and_remove_markers(&mut doc).unwrap();

        assert_eq!(fields.len(), 1);
        assert!(!doc.get_object(pages[0]).unwrap().as_dict().unwrap().has(b"Annots"));
        let elem = doc.get_object(link_elem).unwrap().as_dict().unwrap();
        let objr = elem.get(b"K").unwrap().as_dict().unwrap();
        let target = objr.get(b"Obj").unwrap().as_reference().unwrap();
        assert!(doc.get_object(target).unwrap().as_dict().is_ok());
    }

    #[test]
    fn document_without_markers_is_untouched() {
        let (mut doc, pages) = two_page_doc();
        let site = link(&mut doc, "https://example.com/", [10, 10, 50, 20]);
        set_annots(&mut doc, pages[0], vec![site]);
        let object_count = doc.objects.len();

        let fields = extract_and_remove_markers(&mut doc).unwrap();

        assert!(fields.is_empty());
        assert_eq!(doc.objects.len(), object_count);
        assert_eq!(page_annotations(&doc, pages[0]).unwrap().len(), 1);
    }
}
