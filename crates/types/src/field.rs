//! Form field descriptions extracted from rendered documents.

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of form field kinds the HTML templating layer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Select,
    Checkbox,
    Radio,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Select => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown form field type '{0}'")]
pub struct UnknownFieldKind(pub String);

impl FromStr for FieldKind {
    type Err = UnknownFieldKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldKind::Text),
            "textarea" => Ok(FieldKind::Textarea),
            "select" => Ok(FieldKind::Select),
            "checkbox" => Ok(FieldKind::Checkbox),
            "radio" => Ok(FieldKind::Radio),
            other => Err(UnknownFieldKind(other.to_string())),
        }
    }
}

/// Position and semantics of one form field, recovered from a marker
/// annotation on a rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPosition {
    pub name: String,
    pub kind: FieldKind,
    /// Rectangle of the marker annotation, untransformed.
    pub rect: Rect,
    /// Zero-based page ordinal.
    pub page_index: usize,
    /// Choices of a `select` field. Markers cannot carry these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Export value of a checkbox or radio option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FieldPosition {
    pub fn new(name: impl Into<String>, kind: FieldKind, rect: Rect, page_index: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            rect,
            page_index,
            options: None,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// The export value if present and non-empty.
    pub fn export_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }
}
