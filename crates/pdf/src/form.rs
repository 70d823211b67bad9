//! The document's interactive form and the fields it can grow.
//!
//! [`AcroForm`] owns the document for the duration of synthesis. It reuses an
//! existing `/AcroForm` dictionary when present, keeps track of taken field
//! names, and attaches each new widget to both its page and the form.
//!
//! Field names are fully qualified: `contact.email` becomes a non-terminal
//! field `contact` with a kid whose partial name is `email`.

use crate::appearance;
use crate::error::{FieldError, PdfError};
use crate::fonts::{DEFAULT_FONT_NAME, FormFont, SYMBOL_FONT_NAME, standard_font};
use crate::page::{page_ids, push_page_annotation, rect_array, resolve};
use crate::text::{decode_text_string, format_number, text_string};
use bitflags::bitflags;
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use mdforge_types::{Color, Rect};
use std::collections::HashMap;

bitflags! {
    /// `/Ff` bits of text fields (`/FT /Tx`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextFieldFlags: u32 {
        const MULTILINE = 1 << 12;
        const PASSWORD = 1 << 13;
        const DO_NOT_SCROLL = 1 << 23;
    }
}

bitflags! {
    /// `/Ff` bits of button fields (`/FT /Btn`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ButtonFieldFlags: u32 {
        const NO_TOGGLE_TO_OFF = 1 << 14;
        const RADIO = 1 << 15;
        const PUSHBUTTON = 1 << 16;
    }
}

bitflags! {
    /// `/Ff` bits of choice fields (`/FT /Ch`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChoiceFieldFlags: u32 {
        const COMBO = 1 << 17;
        const EDIT = 1 << 18;
        const SORT = 1 << 19;
    }
}

/// Annotation flag: print the widget.
const ANNOT_FLAG_PRINT: i64 = 4;

/// On-state appearance name of standalone checkboxes.
pub const CHECKBOX_ON_STATE: &str = "Yes";

/// Default background of radio widgets. Removed again by
/// [`appearance::strip_widget_backgrounds`].
const RADIO_DEFAULT_BACKGROUND: Color = Color::WHITE;

fn color_array(color: Color) -> Object {
    Object::Array(color.components().iter().map(|&c| Object::Real(c.into())).collect())
}

/// Deepest field tree walked when collecting existing names.
const MAX_FIELD_DEPTH: usize = 32;

/// A named node of the field tree, keyed by its fully qualified name.
#[derive(Debug, Clone, Copy)]
struct FieldNode {
    id: Option<ObjectId>,
    terminal: bool,
}

/// Where a new terminal field goes: below `parent` (or directly in
/// `/Fields`), carrying `partial` as its `/T`.
#[derive(Debug)]
struct Placement {
    full_name: String,
    parent: Option<ObjectId>,
    partial: String,
}

fn partial_name(dict: &Dictionary) -> Option<String> {
    match dict.get(b"T") {
        Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

/// Mutable view of a document's interactive form.
pub struct AcroForm<'a> {
    doc: &'a mut Document,
    acroform_id: ObjectId,
    pages: Vec<ObjectId>,
    fields: HashMap<String, FieldNode>,
    font: FormFont,
    font_size: Option<f32>,
}

impl<'a> AcroForm<'a> {
    /// Opens the document's form, creating `/AcroForm` if the catalog has
    /// none. Default resources always end up holding Helvetica (`/Helv`) and
    /// ZapfDingbats (`/ZaDb`).
    pub fn open(doc: &'a mut Document) -> Result<Self, PdfError> {
        let catalog_id = doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|_| PdfError::Structure("trailer has no /Root reference".to_string()))?;

        let existing = doc.get_object(catalog_id)?.as_dict()?.get(b"AcroForm").ok().cloned();
        let acroform_id = match existing {
            Some(Object::Reference(id)) if doc.get_object(id).and_then(Object::as_dict).is_ok() => id,
            Some(Object::Dictionary(dict)) => doc.add_object(dict),
            _ => doc.add_object(dictionary! {}),
        };
        doc.get_object_mut(catalog_id)?
            .as_dict_mut()?
            .set("AcroForm", acroform_id);

        let mut form = Self {
            doc,
            acroform_id,
            pages: Vec::new(),
            fields: HashMap::new(),
            font: FormFont { resource_name: DEFAULT_FONT_NAME.to_string(), font_id: (0, 0), family: None },
            font_size: None,
        };
        form.pages = page_ids(form.doc);
        form.normalize_dictionary()?;
        form.font = form.ensure_standard_font(DEFAULT_FONT_NAME, "Helvetica")?;
        form.ensure_standard_font(SYMBOL_FONT_NAME, "ZapfDingbats")?;
        form.fields = form.existing_fields();

        log::debug!(
            "Opened AcroForm {:?} with {} existing named fields on {} pages",
            form.acroform_id,
            form.fields.len(),
            form.pages.len()
        );
        Ok(form)
    }

    pub fn acroform_id(&self) -> ObjectId {
        self.acroform_id
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn document(&mut self) -> &mut Document {
        self.doc
    }

    /// Font size written into new fields' `/DA`. `None` means auto (`0 Tf`).
    pub fn set_font_size(&mut self, size: Option<f32>) {
        self.font_size = size;
    }

    fn dict_mut(&mut self) -> Result<&mut Dictionary, lopdf::Error> {
        self.doc.get_object_mut(self.acroform_id)?.as_dict_mut()
    }

    /// Inlines `/Fields`, `/DR` and `/DR /Font` so later edits touch one
    /// dictionary, and fills in `/DA`.
    fn normalize_dictionary(&mut self) -> Result<(), lopdf::Error> {
        let form = self.doc.get_object(self.acroform_id)?.as_dict()?;
        let fields = form
            .get(b"Fields")
            .ok()
            .and_then(|f| resolve(self.doc, f))
            .and_then(|f| f.as_array().ok())
            .cloned()
            .unwrap_or_default();
        let mut resources = form
            .get(b"DR")
            .ok()
            .and_then(|r| resolve(self.doc, r))
            .and_then(|r| r.as_dict().ok())
            .cloned()
            .unwrap_or_default();
        let fonts = resources
            .get(b"Font")
            .ok()
            .and_then(|f| resolve(self.doc, f))
            .and_then(|f| f.as_dict().ok())
            .cloned()
            .unwrap_or_default();
        resources.set("Font", fonts);
        let has_da = form.has(b"DA");

        let form = self.dict_mut()?;
        form.set("Fields", Object::Array(fields));
        form.set("DR", resources);
        if !has_da {
            form.set("DA", Object::string_literal(format!("/{} 0 Tf 0 g", DEFAULT_FONT_NAME)));
        }
        Ok(())
    }

    fn font_resources_mut(&mut self) -> Result<&mut Dictionary, lopdf::Error> {
        self.dict_mut()?.get_mut(b"DR")?.as_dict_mut()?.get_mut(b"Font")?.as_dict_mut()
    }

    fn ensure_standard_font(&mut self, resource_name: &str, base_font: &str) -> Result<FormFont, lopdf::Error> {
        let existing = self.font_resources_mut()?.get(resource_name.as_bytes()).ok().cloned();
        let font_id = match existing {
            Some(Object::Reference(id)) => id,
            Some(Object::Dictionary(dict)) => self.doc.add_object(dict),
            _ => self.doc.add_object(standard_font(base_font)),
        };
        self.font_resources_mut()?.set(resource_name, font_id);
        Ok(FormFont { resource_name: resource_name.to_string(), font_id, family: None })
    }

    /// Registers `font` in the default resources and uses it for every field
    /// created from now on.
    pub fn use_font(&mut self, font: FormFont) -> Result<(), PdfError> {
        self.font_resources_mut()?.set(font.resource_name.as_str(), font.font_id);
        self.font = font;
        Ok(())
    }

    /// Every named field in the form, by fully qualified name.
    fn existing_fields(&self) -> HashMap<String, FieldNode> {
        let mut out = HashMap::new();
        let fields = self
            .doc
            .get_object(self.acroform_id)
            .and_then(Object::as_dict)
            .and_then(|form| form.get(b"Fields"))
            .and_then(Object::as_array)
            .cloned()
            .unwrap_or_default();
        self.collect_fields(&fields, None, 0, &mut out);
        out
    }

    fn collect_fields(
        &self,
        nodes: &[Object],
        prefix: Option<&str>,
        depth: usize,
        out: &mut HashMap<String, FieldNode>,
    ) {
        if depth >= MAX_FIELD_DEPTH {
            return;
        }
        for node in nodes {
            let Some(dict) = resolve(self.doc, node).and_then(|n| n.as_dict().ok()) else {
                continue;
            };
            let Some(partial) = partial_name(dict) else {
                continue;
            };
            let full_name = match prefix {
                Some(prefix) => format!("{}.{}", prefix, partial),
                None => partial,
            };
            let kids = dict
                .get(b"Kids")
                .ok()
                .and_then(|k| resolve(self.doc, k))
                .and_then(|k| k.as_array().ok())
                .cloned()
                .unwrap_or_default();
            // Widget kids carry no /T; only named kids make a node non-terminal.
            let terminal = !kids
                .iter()
                .filter_map(|k| resolve(self.doc, k))
                .filter_map(|k| k.as_dict().ok())
                .any(|k| k.has(b"T"));

            out.insert(full_name.clone(), FieldNode { id: node.as_reference().ok(), terminal });
            if !terminal {
                self.collect_fields(&kids, Some(&full_name), depth + 1, out);
            }
        }
    }

    /// Whether a field with this fully qualified name exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Checks `name` against the field tree and creates any missing
    /// non-terminal parents for its leading parts.
    fn claim_name(&mut self, name: &str) -> Result<Placement, FieldError> {
        if name.is_empty() {
            return Err(FieldError::InvalidState("field name is empty".to_string()));
        }
        let parts: Vec<&str> = name.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(FieldError::InvalidState(format!("field name '{}' has an empty part", name)));
        }
        if let Some(node) = self.fields.get(name) {
            return Err(if node.terminal {
                FieldError::DuplicateName(name.to_string())
            } else {
                FieldError::NameConflict(name.to_string())
            });
        }

        let Some((partial, ancestors)) = parts.split_last() else {
            return Err(FieldError::InvalidState("field name is empty".to_string()));
        };
        let mut prefix = String::new();
        for part in ancestors {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(part);
            match self.fields.get(&prefix) {
                Some(node) if node.terminal => return Err(FieldError::NameConflict(prefix)),
                Some(node) if node.id.is_none() => {
                    return Err(FieldError::InvalidState(format!("field '{}' is not an indirect object", prefix)));
                }
                _ => {}
            }
        }

        let mut parent = None;
        prefix.clear();
        for part in ancestors {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(part);
            let id = match self.fields.get(&prefix).and_then(|n| n.id) {
                Some(id) => id,
                None => {
                    let id = self.add_group_node(parent, part)?;
                    self.fields.insert(prefix.clone(), FieldNode { id: Some(id), terminal: false });
                    id
                }
            };
            parent = Some(id);
        }

        Ok(Placement { full_name: name.to_string(), parent, partial: partial.to_string() })
    }

    /// Creates a non-terminal field holding named kids.
    fn add_group_node(&mut self, parent: Option<ObjectId>, partial: &str) -> Result<ObjectId, lopdf::Error> {
        let mut node = dictionary! {
            "T" => text_string(partial),
            "Kids" => Vec::<Object>::new(),
        };
        if let Some(parent) = parent {
            node.set("Parent", parent);
        }
        let node_id = self.doc.add_object(node);
        self.link_field(parent, node_id)?;
        Ok(node_id)
    }

    fn push_kid(&mut self, parent: ObjectId, kid: ObjectId) -> Result<(), lopdf::Error> {
        let kids = self.doc.get_object(parent)?.as_dict()?.get(b"Kids").ok().cloned();
        match kids {
            Some(Object::Reference(array_id)) => {
                self.doc.get_object_mut(array_id)?.as_array_mut()?.push(Object::Reference(kid));
            }
            Some(Object::Array(_)) => {
                self.doc
                    .get_object_mut(parent)?
                    .as_dict_mut()?
                    .get_mut(b"Kids")?
                    .as_array_mut()?
                    .push(Object::Reference(kid));
            }
            _ => {
                self.doc
                    .get_object_mut(parent)?
                    .as_dict_mut()?
                    .set("Kids", vec![Object::Reference(kid)]);
            }
        }
        Ok(())
    }

    /// Hooks a field into the tree: under `parent`, or into `/Fields`.
    fn link_field(&mut self, parent: Option<ObjectId>, field_id: ObjectId) -> Result<(), lopdf::Error> {
        match parent {
            Some(parent) => self.push_kid(parent, field_id),
            None => self.push_field(field_id),
        }
    }

    /// Adds a terminal field at `placement` and records its name.
    fn insert_field(&mut self, placement: Placement, mut field: Dictionary) -> Result<ObjectId, FieldError> {
        field.set("T", text_string(&placement.partial));
        if let Some(parent) = placement.parent {
            field.set("Parent", parent);
        }
        let field_id = self.doc.add_object(field);
        self.link_field(placement.parent, field_id)?;
        self.fields.insert(placement.full_name, FieldNode { id: Some(field_id), terminal: true });
        Ok(field_id)
    }

    /// Object id of the page at `page_index`.
    pub fn page_id(&self, page_index: usize) -> Result<ObjectId, FieldError> {
        self.pages.get(page_index).copied().ok_or(FieldError::PageNotFound(page_index))
    }

    fn default_appearance(&self) -> Object {
        Object::string_literal(format!(
            "/{} {} Tf 0 g",
            self.font.resource_name,
            format_number(self.font_size.unwrap_or(0.0))
        ))
    }

    /// Annotation entries shared by every widget: no border, and a `/MK`
    /// background only when one is given.
    fn widget(&self, page_id: ObjectId, rect: Rect, background: Option<Color>) -> Dictionary {
        let mut mk = Dictionary::new();
        if let Some(background) = background {
            mk.set("BG", color_array(background));
        }
        dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => rect_array(rect),
            "P" => page_id,
            "F" => ANNOT_FLAG_PRINT,
            "BS" => dictionary! { "W" => 0, "S" => "S" },
            "MK" => mk,
        }
    }

    fn push_field(&mut self, field_id: ObjectId) -> Result<(), lopdf::Error> {
        self.dict_mut()?.get_mut(b"Fields")?.as_array_mut()?.push(Object::Reference(field_id));
        Ok(())
    }

    /// Adds a merged field/widget dictionary to the document, its page and
    /// the form.
    fn attach(&mut self, page_id: ObjectId, placement: Placement, field: Dictionary) -> Result<ObjectId, FieldError> {
        let field_id = self.insert_field(placement, field)?;
        push_page_annotation(self.doc, page_id, field_id)?;
        Ok(field_id)
    }

    /// Creates a text field. `multiline` fields scroll rather than clip.
    pub fn add_text_field(
        &mut self,
        name: &str,
        page_index: usize,
        rect: Rect,
        multiline: bool,
    ) -> Result<ObjectId, FieldError> {
        let page_id = self.page_id(page_index)?;
        let placement = self.claim_name(name)?;

        let flags = if multiline { TextFieldFlags::MULTILINE } else { TextFieldFlags::empty() };
        let appearance = appearance::text_appearance(self.doc, rect, "", &self.font, self.font_size, multiline)?;

        let mut field = self.widget(page_id, rect, None);
        field.set("FT", "Tx");
        field.set("Ff", flags.bits() as i64);
        field.set("DA", self.default_appearance());
        field.set("AP", dictionary! { "N" => appearance });
        self.attach(page_id, placement, field)
    }

    /// Creates a combo box offering `options`.
    pub fn add_dropdown(
        &mut self,
        name: &str,
        page_index: usize,
        rect: Rect,
        options: &[String],
    ) -> Result<ObjectId, FieldError> {
        let page_id = self.page_id(page_index)?;
        let placement = self.claim_name(name)?;

        let appearance = appearance::text_appearance(self.doc, rect, "", &self.font, self.font_size, false)?;

        let mut field = self.widget(page_id, rect, None);
        field.set("FT", "Ch");
        field.set("Ff", ChoiceFieldFlags::COMBO.bits() as i64);
        field.set("Opt", options.iter().map(|o| text_string(o)).collect::<Vec<_>>());
        field.set("DA", self.default_appearance());
        field.set("AP", dictionary! { "N" => appearance });
        self.attach(page_id, placement, field)
    }

    /// Creates an unchecked checkbox whose on-state is `/Yes`.
    pub fn add_checkbox(&mut self, name: &str, page_index: usize, rect: Rect) -> Result<ObjectId, FieldError> {
        let page_id = self.page_id(page_index)?;
        let placement = self.claim_name(name)?;

        let (on, off) = appearance::checkbox_appearances(self.doc, rect)?;

        let mut field = self.widget(page_id, rect, None);
        if let Ok(Object::Dictionary(mk)) = field.get_mut(b"MK") {
            mk.set("CA", Object::string_literal("4"));
        }
        field.set("FT", "Btn");
        field.set("Ff", 0);
        field.set("V", "Off");
        field.set("AS", "Off");
        field.set("DA", Object::string_literal(format!("/{} 0 Tf 0 g", SYMBOL_FONT_NAME)));
        field.set(
            "AP",
            dictionary! {
                "N" => dictionary! { CHECKBOX_ON_STATE => on, "Off" => off },
            },
        );
        self.attach(page_id, placement, field)
    }

    /// Creates the parent field of a radio group. Options are added with
    /// [`AcroForm::add_radio_option`].
    pub fn add_radio_group(&mut self, name: &str) -> Result<ObjectId, FieldError> {
        let placement = self.claim_name(name)?;
        let group = dictionary! {
            "FT" => "Btn",
            "Ff" => ButtonFieldFlags::RADIO.bits() as i64,
            "V" => "Off",
            "Kids" => Vec::<Object>::new(),
        };
        self.insert_field(placement, group)
    }

    /// Adds one widget to a radio group. `export_value` names its on-state.
    pub fn add_radio_option(
        &mut self,
        group_id: ObjectId,
        export_value: &str,
        page_index: usize,
        rect: Rect,
    ) -> Result<ObjectId, FieldError> {
        if export_value.is_empty() {
            return Err(FieldError::InvalidState("radio export value is empty".to_string()));
        }
        let page_id = self.page_id(page_index)?;

        let (on, off) = appearance::radio_appearances(self.doc, rect)?;
        let mut states = Dictionary::new();
        states.set(export_value, on);
        states.set("Off", off);

        let mut widget = self.widget(page_id, rect, Some(RADIO_DEFAULT_BACKGROUND));
        if let Ok(Object::Dictionary(mk)) = widget.get_mut(b"MK") {
            mk.set("CA", Object::string_literal("l"));
        }
        widget.set("Parent", group_id);
        widget.set("AS", "Off");
        widget.set("DA", Object::string_literal(format!("/{} 0 Tf 0 g", SYMBOL_FONT_NAME)));
        widget.set("AP", dictionary! { "N" => states });

        let widget_id = self.doc.add_object(widget);
        push_page_annotation(self.doc, page_id, widget_id)?;
        self.push_kid(group_id, widget_id)?;
        Ok(widget_id)
    }
}
