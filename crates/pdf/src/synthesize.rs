//! Turns marker annotations into a working AcroForm.
//!
//! The pass runs in a fixed order: extract markers, group them, pick and
//! embed a font, create fields (simple fields, then radio groups, then
//! checkbox groups), draw dropdown arrows, then normalize appearances. A
//! field that cannot be created is skipped and recorded; only load and save
//! failures abort the document.

use crate::appearance::{strip_widget_backgrounds, update_field_appearances};
use crate::content::{DropdownArrow, PageOverlays};
use crate::error::{FieldError, PdfError};
use crate::extract::extract_and_remove_markers;
use crate::fonts::{FormFont, embed_font, form_font_size, select_font};
use crate::form::AcroForm;
use crate::grouping::group_fields;
use crate::{load_document, save_document};
use lopdf::Document;
use mdforge_types::{EmbeddedFont, FieldKind, FieldPosition, FormFontInfo};
use std::collections::HashMap;

/// Why a field or group was left out of the form.
pub type SkipReason = FieldError;

/// Inputs of one synthesis run besides the PDF itself.
#[derive(Debug, Clone, Default)]
pub struct AcroFormConfig {
    /// Choices of each `select` field, keyed by field name.
    pub select_options: HashMap<String, Vec<String>>,
    /// Font family and pixel size observed on the rendered controls.
    pub form_font: Option<FormFontInfo>,
    /// Faces available for embedding.
    pub embedded_fonts: Vec<EmbeddedFont>,
}

impl AcroFormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_select_options(mut self, name: impl Into<String>, options: Vec<String>) -> Self {
        self.select_options.insert(name.into(), options);
        self
    }

    pub fn with_form_font(mut self, font_family: impl Into<String>, font_size: f32) -> Self {
        self.form_font = Some(FormFontInfo { font_family: font_family.into(), font_size });
        self
    }

    pub fn with_embedded_font(mut self, font: EmbeddedFont) -> Self {
        self.embedded_fonts.push(font);
        self
    }
}

/// What happened to one field, or one whole radio group.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    Created { name: String, kind: FieldKind },
    Skipped { name: String, kind: FieldKind, reason: SkipReason },
}

impl FieldOutcome {
    pub fn name(&self) -> &str {
        match self {
            FieldOutcome::Created { name, .. } | FieldOutcome::Skipped { name, .. } => name,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, FieldOutcome::Created { .. })
    }
}

/// Summary of a synthesis run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisReport {
    pub markers_found: usize,
    pub outcomes: Vec<FieldOutcome>,
    /// Family of the embedded face, if one was embedded.
    pub embedded_font: Option<String>,
    pub font_size: Option<f32>,
    pub appearances_updated: usize,
    pub backgrounds_stripped: usize,
}

impl SynthesisReport {
    pub fn created(&self) -> impl Iterator<Item = &FieldOutcome> {
        self.outcomes.iter().filter(|o| o.is_created())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &FieldOutcome> {
        self.outcomes.iter().filter(|o| !o.is_created())
    }

    pub fn created_count(&self) -> usize {
        self.created().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }
}

/// Replaces every marker in `pdf` with a fillable field.
///
/// A document without pages or without markers comes back re-serialized but
/// otherwise unchanged.
///
/// # Errors
///
/// `PdfError::Load` if the input cannot be parsed, `PdfError::Save` if the
/// result cannot be written.
pub fn add_acroform_fields(pdf: &[u8], config: &AcroFormConfig) -> Result<Vec<u8>, PdfError> {
    add_acroform_fields_with_report(pdf, config).map(|(bytes, _)| bytes)
}

/// Same as [`add_acroform_fields`], also returning what was created.
pub fn add_acroform_fields_with_report(
    pdf: &[u8],
    config: &AcroFormConfig,
) -> Result<(Vec<u8>, SynthesisReport), PdfError> {
    let mut doc = load_document(pdf)?;
    let report = synthesize_fields(&mut doc, config)?;
    let bytes = save_document(&mut doc)?;
    Ok((bytes, report))
}

fn resolve_form_font(doc: &mut Document, config: &AcroFormConfig) -> Option<FormFont> {
    let family = config.form_font.as_ref().map(|f| f.font_family.as_str());
    let candidate = select_font(family, &config.embedded_fonts)?;
    match embed_font(doc, candidate) {
        Ok(font) => Some(font),
        Err(e) => {
            log::warn!("Could not embed form font '{}', using Helvetica: {}", candidate.family, e);
            None
        }
    }
}

fn create_simple_field(
    form: &mut AcroForm<'_>,
    overlays: &mut PageOverlays,
    field: &FieldPosition,
    font_size: Option<f32>,
) -> Result<(), FieldError> {
    match field.kind {
        FieldKind::Text | FieldKind::Textarea => {
            form.add_text_field(&field.name, field.page_index, field.rect, field.kind == FieldKind::Textarea)?;
        }
        FieldKind::Select => {
            let options = field.options.as_deref().unwrap_or_default();
            form.add_dropdown(&field.name, field.page_index, field.rect, options)?;
            let page_id = form.page_id(field.page_index)?;
            overlays.push(page_id, DropdownArrow::for_field(field.rect, font_size).operations());
        }
        FieldKind::Checkbox => {
            form.add_checkbox(&field.name, field.page_index, field.rect.square_at_origin())?;
        }
        FieldKind::Radio => {
            return Err(FieldError::InvalidState(format!(
                "radio option '{}' outside of a group",
                field.name
            )));
        }
    }
    Ok(())
}

fn record(report: &mut SynthesisReport, name: &str, kind: FieldKind, result: Result<(), FieldError>) {
    let outcome = match result {
        Ok(()) => {
            log::debug!("Created {} field '{}'", kind, name);
            FieldOutcome::Created { name: name.to_string(), kind }
        }
        Err(reason) => {
            log::warn!("Skipping {} field '{}': {}", kind, name, reason);
            FieldOutcome::Skipped { name: name.to_string(), kind, reason }
        }
    };
    report.outcomes.push(outcome);
}

/// Runs the whole pass on an already loaded document.
pub fn synthesize_fields(doc: &mut Document, config: &AcroFormConfig) -> Result<SynthesisReport, PdfError> {
    let mut report = SynthesisReport::default();

    if doc.get_pages().is_empty() {
        log::debug!("Document has no pages; nothing to synthesize");
        return Ok(report);
    }

    let mut fields = extract_and_remove_markers(doc)?;
    report.markers_found = fields.len();
    if fields.is_empty() {
        log::debug!("No form markers found");
        return Ok(report);
    }

    for field in fields.iter_mut().filter(|f| f.kind == FieldKind::Select) {
        field.options = Some(config.select_options.get(&field.name).cloned().unwrap_or_default());
    }

    let font_size = config.form_font.as_ref().map(|f| form_font_size(f.font_size));
    report.font_size = font_size;
    let custom_font = resolve_form_font(doc, config);
    report.embedded_font = custom_font.as_ref().and_then(|f| f.family.clone());

    let groups = group_fields(fields);
    let mut overlays = PageOverlays::new();
    let mut form = AcroForm::open(doc)?;
    form.set_font_size(font_size);
    if let Some(font) = custom_font.clone() {
        form.use_font(font)?;
    }

    for field in &groups.simple {
        let result = create_simple_field(&mut form, &mut overlays, field, font_size);
        record(&mut report, &field.name, field.kind, result);
    }

    for (name, members) in &groups.radio_groups {
        let result = form.add_radio_group(name).map(|group_id| {
            for member in members {
                let export_value = member.export_value().unwrap_or(&member.name);
                if let Err(e) =
                    form.add_radio_option(group_id, export_value, member.page_index, member.rect.square_at_origin())
                {
                    log::warn!("Skipping option '{}' of radio group '{}': {}", export_value, name, e);
                }
            }
        });
        record(&mut report, name, FieldKind::Radio, result);
    }

    for (name, members) in &groups.checkbox_groups {
        for member in members {
            let value = member.export_value().unwrap_or_default();
            let field_name = format!("{}_{}", name, value);
            let result = form
                .add_checkbox(&field_name, member.page_index, member.rect.square_at_origin())
                .map(|_| ());
            record(&mut report, &field_name, FieldKind::Checkbox, result);
        }
    }

    let acroform_id = form.acroform_id();
    overlays.apply(doc)?;

    if let Some(font) = &custom_font {
        report.appearances_updated = update_field_appearances(doc, acroform_id, font)?;
    }
    report.backgrounds_stripped = strip_widget_backgrounds(doc, acroform_id)?;

    log::info!(
        "AcroForm synthesis: {} markers, {} fields created, {} skipped",
        report.markers_found,
        report.created_count(),
        report.skipped_count()
    );
    Ok(report)
}
