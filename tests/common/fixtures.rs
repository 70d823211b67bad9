use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use mdforge::{FieldKind, Rect};
use mdforge_pdf::marker;

/// One link annotation to place on a fixture page.
#[derive(Debug, Clone)]
pub struct Annot {
    pub page: usize,
    pub uri: String,
    pub rect: Rect,
}

impl Annot {
    pub fn marker(page: usize, name: &str, kind: FieldKind, value: Option<&str>, rect: Rect) -> Self {
        Self { page, uri: marker::encode(name, kind, value), rect }
    }

    pub fn link(page: usize, uri: &str, rect: Rect) -> Self {
        Self { page, uri: uri.to_string(), rect }
    }
}

/// Builds small PDFs the way the browser leaves them: a few text pages with
/// link annotations on top.
#[derive(Debug, Clone)]
pub struct PdfFixture {
    pages: usize,
    annots: Vec<Annot>,
    indirect_annots: bool,
    existing_text_field: Option<String>,
}

impl PdfFixture {
    pub fn new(pages: usize) -> Self {
        Self { pages, annots: Vec::new(), indirect_annots: false, existing_text_field: None }
    }

    pub fn with(mut self, annot: Annot) -> Self {
        self.annots.push(annot);
        self
    }

    /// Stores each page's `/Annots` array as its own object.
    pub fn indirect_annots(mut self) -> Self {
        self.indirect_annots = true;
        self
    }

    /// Adds a pre-existing AcroForm text field on page 0 whose widget has a
    /// white `/MK /BG`.
    pub fn with_existing_text_field(mut self, name: &str) -> Self {
        self.existing_text_field = Some(name.to_string());
        self
    }

    fn link_object(doc: &mut Document, annot: &Annot) -> ObjectId {
        let corners = annot.rect.corners().iter().map(|&v| Object::Real(v.into())).collect::<Vec<_>>();
        doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => corners,
            "Border" => vec![0.into(), 0.into(), 0.into()],
            "A" => dictionary! {
                "Type" => "Action",
                "S" => "URI",
                "URI" => Object::String(annot.uri.clone().into_bytes(), StringFormat::Literal),
            },
        })
    }

    pub fn build_document(&self) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut page_ids = Vec::new();
        for i in 0..self.pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(format!("Form page {}", i + 1).into_bytes(), StringFormat::Literal)],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            page_ids.push(page_id);
        }

        for (index, page_id) in page_ids.iter().enumerate() {
            let annots: Vec<Object> = self
                .annots
                .iter()
                .filter(|a| a.page == index)
                .map(|a| Object::Reference(Self::link_object(&mut doc, a)))
                .collect();
            if annots.is_empty() {
                continue;
            }
            let annots = if self.indirect_annots {
                Object::Reference(doc.add_object(Object::Array(annots)))
            } else {
                Object::Array(annots)
            };
            doc.get_object_mut(*page_id).unwrap().as_dict_mut().unwrap().set("Annots", annots);
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
                "Count" => self.pages as i64,
            }),
        );

        let mut catalog = dictionary! { "Type" => "Catalog", "Pages" => pages_id };
        if let (Some(name), Some(&page_id)) = (&self.existing_text_field, page_ids.first()) {
            let widget_id = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Tx",
                "T" => Object::string_literal(name.as_str()),
                "Rect" => vec![50.into(), 50.into(), 200.into(), 70.into()],
                "P" => page_id,
                "MK" => dictionary! { "BG" => vec![1.into(), 1.into(), 1.into()] },
            });
            let page = doc.get_object_mut(page_id).unwrap().as_dict_mut().unwrap();
            let mut annots = page.get(b"Annots").and_then(Object::as_array).cloned().unwrap_or_default();
            annots.push(Object::Reference(widget_id));
            page.set("Annots", annots);
            let form_id = doc.add_object(dictionary! {
                "Fields" => vec![Object::Reference(widget_id)],
                "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
            });
            catalog.set("AcroForm", form_id);
        }

        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);
        doc
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = self.build_document();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}
