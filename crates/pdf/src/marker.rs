//! Marker URLs: form field identity smuggled through a hyperlink.
//!
//! The HTML templating layer wraps every form control in an invisible anchor
//! whose `href` encodes the field name, type and export value. The browser
//! turns that anchor into a PDF link annotation with the control's exact
//! rectangle, which [`crate::extract`] later reads back.
//!
//! Format: `https://mdforge.marker/{name}?type={type}&value={value}`

use mdforge_types::FieldKind;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use url::Url;

/// Reserved prefix every marker URL starts with.
pub const MARKER_URL_PREFIX: &str = "https://mdforge.marker/";

/// Characters left unescaped in the name segment (same set as
/// `encodeURIComponent`).
const NAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Field identity carried by one marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerInfo {
    pub name: String,
    pub kind: FieldKind,
    pub value: Option<String>,
}

/// Builds the marker URL for a field.
pub fn encode(name: &str, kind: FieldKind, value: Option<&str>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("type", kind.as_str());
    if let Some(value) = value {
        query.append_pair("value", value);
    }
    format!(
        "{}{}?{}",
        MARKER_URL_PREFIX,
        utf8_percent_encode(name, NAME_ESCAPE),
        query.finish()
    )
}

/// Recovers the field identity from a link target.
///
/// Returns `None` for anything that is not a well-formed marker: foreign
/// prefix, unparseable URL, empty name, missing or unknown `type`.
pub fn decode(url: &str) -> Option<MarkerInfo> {
    if !url.starts_with(MARKER_URL_PREFIX) {
        return None;
    }

    let parsed = Url::parse(url).ok()?;
    let path = parsed.path();
    let raw_name = path.strip_prefix('/').unwrap_or(path);
    let name = percent_decode_str(raw_name).decode_utf8().ok()?.into_owned();

    let mut kind = None;
    let mut value = None;
    for (key, val) in parsed.query_pairs() {
        match key.as_ref() {
            "type" if kind.is_none() => kind = Some(val.into_owned()),
            "value" if value.is_none() => value = Some(val.into_owned()),
            _ => {}
        }
    }

    if name.is_empty() {
        return None;
    }
    let kind = kind?.parse::<FieldKind>().ok()?;

    Some(MarkerInfo {
        name,
        kind,
        value: value.filter(|v| !v.is_empty()),
    })
}

/// Renders the invisible anchor the templating layer places over a form
/// control. It must cover the control exactly; its box becomes the field
/// rectangle.
pub fn marker_anchor_html(name: &str, kind: FieldKind, value: Option<&str>) -> String {
    format!(
        r#"<a class="mdforge-marker" href="{}" tabindex="-1" aria-hidden="true" style="position:absolute;inset:0;display:block;opacity:0"></a>"#,
        escape_attribute(&encode(name, kind, value))
    )
}

fn escape_attribute(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
