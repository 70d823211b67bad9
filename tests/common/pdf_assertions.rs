use lopdf::{Dictionary, Document, Object, ObjectId};
use mdforge_pdf::MARKER_URL_PREFIX;

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn page_id(doc: &Document, page_index: usize) -> ObjectId {
    *doc.get_pages().get(&(page_index as u32 + 1)).expect("page exists")
}

/// Annotation dictionaries on one page.
pub fn page_annotations(doc: &Document, page_index: usize) -> Vec<&Dictionary> {
    let page = doc.get_object(page_id(doc, page_index)).unwrap().as_dict().unwrap();
    let Some(annots) = page.get(b"Annots").ok().and_then(|a| resolve(doc, a)) else {
        return Vec::new();
    };
    annots
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| resolve(doc, a))
        .filter_map(|a| a.as_dict().ok())
        .collect()
}

fn link_uri(doc: &Document, annot: &Dictionary) -> Option<String> {
    let action = resolve(doc, annot.get(b"A").ok()?)?.as_dict().ok()?;
    let uri = resolve(doc, action.get(b"URI").ok()?)?.as_str().ok()?;
    Some(String::from_utf8_lossy(uri).into_owned())
}

/// URIs of every link annotation in the document.
pub fn link_uris(doc: &Document) -> Vec<String> {
    (0..doc.get_pages().len())
        .flat_map(|page| page_annotations(doc, page))
        .filter(|a| matches!(a.get(b"Subtype"), Ok(Object::Name(n)) if n.as_slice() == b"Link"))
        .filter_map(|a| link_uri(doc, a))
        .collect()
}

/// Number of marker links still present anywhere in the document.
pub fn count_marker_links(doc: &Document) -> usize {
    link_uris(doc).iter().filter(|u| u.starts_with(MARKER_URL_PREFIX)).count()
}

/// The catalog's `/AcroForm` dictionary, if any.
pub fn acroform(doc: &Document) -> Option<&Dictionary> {
    let root = doc.trailer.get(b"Root").ok()?.as_reference().ok()?;
    let catalog = doc.get_object(root).ok()?.as_dict().ok()?;
    resolve(doc, catalog.get(b"AcroForm").ok()?)?.as_dict().ok()
}

/// Top-level form fields as `(name, dictionary)` pairs, in `/Fields` order.
pub fn form_fields(doc: &Document) -> Vec<(String, &Dictionary)> {
    let Some(form) = acroform(doc) else {
        return Vec::new();
    };
    let fields = form.get(b"Fields").ok().and_then(|f| resolve(doc, f)).and_then(|f| f.as_array().ok());
    fields
        .into_iter()
        .flatten()
        .filter_map(|f| resolve(doc, f))
        .filter_map(|f| f.as_dict().ok())
        .map(|f| {
            let name = f
                .get(b"T")
                .ok()
                .and_then(|t| t.as_str().ok())
                .map(|t| String::from_utf8_lossy(t).into_owned())
                .unwrap_or_default();
            (name, f)
        })
        .collect()
}

pub fn field_names(doc: &Document) -> Vec<String> {
    form_fields(doc).into_iter().map(|(name, _)| name).collect()
}

pub fn field<'a>(doc: &'a Document, name: &str) -> &'a Dictionary {
    form_fields(doc)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, f)| f)
        .unwrap_or_else(|| panic!("no field named '{}' in {:?}", name, field_names(doc)))
}

/// A field by fully qualified name, following `/Kids` for dotted names.
pub fn field_at_path<'a>(doc: &'a Document, path: &str) -> &'a Dictionary {
    let mut parts = path.split('.');
    let mut current = field(doc, parts.next().expect("non-empty path"));
    for part in parts {
        current = kids_of(doc, current)
            .into_iter()
            .find(|kid| kid.get(b"T").ok().and_then(|t| t.as_str().ok()) == Some(part.as_bytes()))
            .unwrap_or_else(|| panic!("no kid '{}' on the way to '{}'", part, path));
    }
    current
}

pub fn name_of<'a>(dict: &'a Dictionary, key: &[u8]) -> &'a [u8] {
    match dict.get(key) {
        Ok(Object::Name(n)) => n.as_slice(),
        other => panic!("expected name at {:?}, found {:?}", String::from_utf8_lossy(key), other),
    }
}

pub fn flags_of(dict: &Dictionary) -> u32 {
    dict.get(b"Ff").ok().and_then(|f| f.as_i64().ok()).unwrap_or(0) as u32
}

pub fn string_of(dict: &Dictionary, key: &[u8]) -> String {
    String::from_utf8_lossy(dict.get(key).unwrap().as_str().unwrap()).into_owned()
}

/// `[llx, lly, urx, ury]` of an annotation.
pub fn rect_of(dict: &Dictionary) -> [f32; 4] {
    let values = dict.get(b"Rect").unwrap().as_array().unwrap();
    let mut out = [0.0; 4];
    for (slot, v) in out.iter_mut().zip(values) {
        *slot = match v {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r as f32,
            other => panic!("non-numeric rect entry {:?}", other),
        };
    }
    out
}

pub fn assert_rect_eq(actual: [f32; 4], expected: [f32; 4]) {
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!((a - e).abs() < 0.01, "rect {:?} != {:?}", actual, expected);
    }
}

/// Kid widget dictionaries of a field.
pub fn kids_of<'a>(doc: &'a Document, field: &'a Dictionary) -> Vec<&'a Dictionary> {
    field
        .get(b"Kids")
        .ok()
        .and_then(|k| k.as_array().ok())
        .into_iter()
        .flatten()
        .filter_map(|k| resolve(doc, k))
        .filter_map(|k| k.as_dict().ok())
        .collect()
}

/// The `/MK` dictionary of a widget.
pub fn mk_of<'a>(doc: &'a Document, widget: &'a Dictionary) -> Option<&'a Dictionary> {
    resolve(doc, widget.get(b"MK").ok()?)?.as_dict().ok()
}

/// Decoded page content across all content streams of a page.
pub fn page_content(doc: &Document, page_index: usize) -> String {
    let content = doc.get_page_content(page_id(doc, page_index)).unwrap_or_default();
    String::from_utf8_lossy(&content).into_owned()
}

/// Value of an `/Info` entry.
pub fn info_entry(doc: &Document, key: &[u8]) -> Option<Vec<u8>> {
    let info = resolve(doc, doc.trailer.get(b"Info").ok()?)?.as_dict().ok()?;
    info.get(key).ok()?.as_str().ok().map(<[u8]>::to_vec)
}
