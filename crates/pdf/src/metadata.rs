//! Document information dictionary (`/Info`) injection.

use crate::error::PdfError;
use crate::text::text_string;
use crate::{load_document, save_document};
use chrono::{DateTime, Utc};
use lopdf::{Dictionary, Document, Object};
use serde::{Deserialize, Serialize};

/// Creator written when none is configured.
pub const DEFAULT_CREATOR: &str = "mdforge";

/// Values for the document information dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Vec<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

impl PdfMetadata {
    /// True when any of title, author, subject or keywords is set. Creator and
    /// producer alone do not justify rewriting a document.
    pub fn has_content(&self) -> bool {
        [&self.title, &self.author, &self.subject].iter().any(|v| non_empty(v).is_some())
            || self.keywords.iter().any(|k| !k.is_empty())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// A PDF date string (`D:YYYYMMDDHHmmSSZ`).
pub fn pdf_date(time: DateTime<Utc>) -> String {
    time.format("D:%Y%m%d%H%M%SZ").to_string()
}

fn info_dict_mut(doc: &mut Document) -> Result<&mut Dictionary, PdfError> {
    let existing = doc.trailer.get(b"Info").ok().cloned();
    let info_id = match existing {
        Some(Object::Reference(id)) if doc.get_object(id).and_then(Object::as_dict).is_ok() => id,
        Some(Object::Dictionary(inline)) => doc.add_object(inline),
        _ => doc.add_object(Dictionary::new()),
    };
    doc.trailer.set("Info", info_id);
    Ok(doc.get_object_mut(info_id)?.as_dict_mut()?)
}

/// Writes `metadata` into the document's `/Info` dictionary, creating it if
/// needed. `/ModDate` is always set to the current time.
pub fn apply_metadata(doc: &mut Document, metadata: &PdfMetadata) -> Result<(), PdfError> {
    let info = info_dict_mut(doc)?;

    let keywords: Vec<&str> = metadata.keywords.iter().map(String::as_str).filter(|k| !k.is_empty()).collect();
    let keywords = keywords.join(" ");
    let entries = [
        ("Title", non_empty(&metadata.title)),
        ("Author", non_empty(&metadata.author)),
        ("Subject", non_empty(&metadata.subject)),
        ("Keywords", Some(keywords.as_str()).filter(|k| !k.is_empty())),
        ("Creator", non_empty(&metadata.creator)),
        ("Producer", non_empty(&metadata.producer)),
    ];
    for (key, value) in entries {
        if let Some(value) = value {
            info.set(key, text_string(value));
        }
    }
    info.set("ModDate", Object::string_literal(pdf_date(Utc::now())));

    log::debug!("Applied document metadata (title: {:?})", metadata.title);
    Ok(())
}

/// Loads `pdf`, applies `metadata` and serializes the result.
pub fn inject_metadata(pdf: &[u8], metadata: &PdfMetadata) -> Result<Vec<u8>, PdfError> {
    let mut doc = load_document(pdf)?;
    apply_metadata(&mut doc, metadata)?;
    save_document(&mut doc)
}
