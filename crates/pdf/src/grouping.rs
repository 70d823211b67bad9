//! Splits extracted fields into standalone fields and option groups.

use indexmap::IndexMap;
use mdforge_types::{FieldKind, FieldPosition};

/// Fields bucketed for synthesis. Every bucket keeps first-seen order.
#[derive(Debug, Default)]
pub struct FieldGroups {
    /// Text, textarea, select and value-less checkbox fields.
    pub simple: Vec<FieldPosition>,
    /// Radio options keyed by their shared name.
    pub radio_groups: IndexMap<String, Vec<FieldPosition>>,
    /// Checkboxes that carry an export value, keyed by their shared name.
    pub checkbox_groups: IndexMap<String, Vec<FieldPosition>>,
}

impl FieldGroups {
    /// Total number of field records across all buckets.
    pub fn len(&self) -> usize {
        self.simple.len()
            + self.radio_groups.values().map(Vec::len).sum::<usize>()
            + self.checkbox_groups.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn group_fields(fields: Vec<FieldPosition>) -> FieldGroups {
    let mut groups = FieldGroups::default();
    for field in fields {
        match field.kind {
            FieldKind::Radio => groups.radio_groups.entry(field.name.clone()).or_default().push(field),
            FieldKind::Checkbox if field.export_value().is_some() => {
                groups.checkbox_groups.entry(field.name.clone()).or_default().push(field)
            }
            FieldKind::Text | FieldKind::Textarea | FieldKind::Select | FieldKind::Checkbox => {
                groups.simple.push(field)
            }
        }
    }
    groups
}
