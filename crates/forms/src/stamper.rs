//! Stamping engine
//!
//! Resolves every placement of a document against an applicant record and
//! draws the result on the template.

use crate::format::{format_amount, format_date};
use crate::schema::*;
use crate::{ApplicantRecord, FormsError, Result};
use chrono::NaiveDate;
use log::debug;
use pdf_core::{Align, Color, PdfDocument, StandardFont};

/// A resolved drawing operation in PDF coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct DrawOp {
    /// Page index (0-based)
    pub page: usize,
    /// Left edge of the text run or image
    pub x: f64,
    /// Text baseline or bottom edge of the image
    pub y: f64,
    pub content: DrawContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawContent {
    /// Text with its measured width in points
    Text { text: String, size: f32, width: f64 },
    /// The signature image box
    Signature {
        width: f64,
        height: f64,
        fit: SignatureFit,
    },
}

/// Stamps documents of one term
pub struct Stamper<'a> {
    term: &'a TermConfig,
    font_data: Option<&'a [u8]>,
}

impl<'a> Stamper<'a> {
    pub fn new(term: &'a TermConfig) -> Self {
        Self {
            term,
            font_data: None,
        }
    }

    /// TrueType bytes for a term whose font has a `source`
    pub fn with_font_data(mut self, data: &'a [u8]) -> Self {
        self.font_data = Some(data);
        self
    }

    /// Resolve the draw operations without producing a PDF
    pub fn plan(
        &self,
        document: &DocumentDescriptor,
        template: &[u8],
        record: &ApplicantRecord,
    ) -> Result<Vec<DrawOp>> {
        let (mut doc, font_name) = self.open(template)?;
        self.plan_on(&mut doc, &font_name, document, record)
    }

    /// Stamp a template and return the new PDF bytes
    ///
    /// Fails with `PageOutOfRange` / `OutOfBounds` when a placement does not
    /// fit the template. Output depends only on the inputs.
    pub fn stamp(
        &self,
        document: &DocumentDescriptor,
        template: &[u8],
        record: &ApplicantRecord,
    ) -> Result<Vec<u8>> {
        let (mut doc, font_name) = self.open(template)?;
        let ops = self.plan_on(&mut doc, &font_name, document, record)?;

        for op in &ops {
            match &op.content {
                DrawContent::Text { text, size, .. } => {
                    doc.set_font(&font_name, *size)?;
                    doc.insert_text(text, op.page, op.x, op.y, Align::Left)?;
                }
                DrawContent::Signature { width, height, fit } => {
                    if let Some(signature) = &record.signature {
                        doc.insert_image_scaled(
                            signature.bytes(),
                            op.page,
                            op.x,
                            op.y,
                            *width,
                            *height,
                            (*fit).into(),
                        )?;
                    }
                }
            }
        }

        Ok(doc.to_bytes()?)
    }

    /// Open the template and register the term's font
    fn open(&self, template: &[u8]) -> Result<(PdfDocument, String)> {
        let mut doc = PdfDocument::open_from_bytes(template)?;
        let font = &self.term.font;

        let font_name = match (&font.source, self.font_data) {
            (None, _) => {
                let standard = StandardFont::from_name(&font.family).ok_or_else(|| {
                    FormsError::Registry(format!("unknown standard font {:?}", font.family))
                })?;
                doc.use_standard_font(standard).to_string()
            }
            (Some(_), Some(data)) => {
                doc.add_font(&font.family, data)?;
                font.family.clone()
            }
            (Some(source), None) => {
                return Err(FormsError::TemplateUnavailable {
                    reference: source.clone(),
                    reason: "font data was not loaded".to_string(),
                })
            }
        };

        let [r, g, b] = font.color;
        doc.set_text_color(Color::from_rgb(r, g, b));

        Ok((doc, font_name))
    }

    fn plan_on(
        &self,
        doc: &mut PdfDocument,
        font_name: &str,
        document: &DocumentDescriptor,
        record: &ApplicantRecord,
    ) -> Result<Vec<DrawOp>> {
        let page_count = doc.page_count();
        let mut ops = Vec::new();

        for placement in &document.placements {
            let page = placement.page();
            if page >= page_count {
                return Err(FormsError::PageOutOfRange {
                    document: document.code.clone(),
                    page,
                    page_count,
                });
            }

            let page_box = doc.page_box(page)?;
            let position = placement.position();
            let (x, y) = (position.x, position.pdf_y(page_box.top));
            if !page_box.contains(x, y) {
                return Err(FormsError::OutOfBounds {
                    document: document.code.clone(),
                    page,
                    x,
                    y,
                });
            }

            match placement {
                Placement::Text(p) => {
                    let text = self.resolve_text(p, record)?;
                    if text.is_empty() {
                        debug!("{}: {} is empty", document.code, placement.describe());
                        continue;
                    }
                    ops.push(measure(doc, font_name, page, x, y, p.anchor, p.size, text)?);
                }
                Placement::Mark(p) => {
                    let selected = match p.group {
                        MarkGroup::Appliance => &record.appliances,
                        MarkGroup::Consent => &record.consents,
                    };
                    if !selected.contains(&p.key) {
                        continue;
                    }
                    ops.push(measure(
                        doc,
                        font_name,
                        page,
                        x,
                        y,
                        p.anchor,
                        p.size,
                        p.glyph.clone(),
                    )?);
                }
                Placement::Signature(p) => {
                    if record.signature.is_none() {
                        debug!("{}: no signature captured", document.code);
                        continue;
                    }
                    ops.push(DrawOp {
                        page,
                        x,
                        y,
                        content: DrawContent::Signature {
                            width: p.width,
                            height: p.height,
                            fit: p.fit,
                        },
                    });
                }
            }
        }

        Ok(ops)
    }

    /// Text a placement shows for this record (empty draws nothing)
    fn resolve_text(&self, placement: &TextPlacement, record: &ApplicantRecord) -> Result<String> {
        let date = |value: Option<NaiveDate>| -> Result<String> {
            match value {
                Some(d) => format_date(d, &self.term.date_format),
                None => Ok(String::new()),
            }
        };

        let text = match placement.field {
            Field::StudentName => record.student_name(),
            Field::StudentFirstName => record.student_first_name.clone(),
            Field::StudentLastName => record.student_last_name.clone(),
            Field::StudentNumber => record.student_number.clone(),
            Field::StudentDob => date(record.student_dob)?,
            Field::Building => record
                .building
                .map(|b| b.name().to_string())
                .unwrap_or_default(),
            Field::Room => record.room.clone(),
            Field::BuildingRoom => record.building_room(),
            Field::StudentEmail => record.student_email.clone(),
            Field::ParentName => record.parent_name(),
            Field::ParentContact => record.parent_contact.clone(),
            Field::ParentAltContact => record.parent_alt_contact.clone(),
            Field::ParentAddress => record.parent_address.clone(),
            Field::ParentRelation => record.parent_relation.clone(),
            Field::ParentEmail => record.parent_email.clone(),
            Field::AltEmergencyName => record.alt_emergency_name.clone(),
            Field::AltEmergencyContact => record.alt_emergency_contact.clone(),
            Field::OtherAppliances => record.other_appliances.clone(),
            Field::OtherAppliancesCost => record.other_appliances_cost.clone().unwrap_or_default(),
            Field::FeeTotal => format_amount(self.term.fees.total_fee(
                &record.appliances,
                record.other_appliances_cost.as_deref(),
            )),
            Field::SubmissionDate => date(record.submission_date)?,
            Field::Static => placement
                .text
                .as_deref()
                .unwrap_or_default()
                .replace("{label}", &self.term.label),
        };

        Ok(text)
    }
}

/// Measure a text run with the drawing font and place it per its anchor
#[allow(clippy::too_many_arguments)]
fn measure(
    doc: &mut PdfDocument,
    font_name: &str,
    page: usize,
    x: f64,
    y: f64,
    anchor: Anchor,
    size: f32,
    text: String,
) -> Result<DrawOp> {
    doc.set_font(font_name, size)?;
    let width = doc.text_width(&text)?;

    Ok(DrawOp {
        page,
        x: Align::from(anchor).start_x(x, width),
        y,
        content: DrawContent::Text { text, size, width },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApplicantForm;
    use lopdf::dictionary;
    use pretty_assertions::assert_eq;

    fn blank_pdf(pages: usize) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<lopdf::Object> = (0..pages)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            lopdf::Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn term(placements: &str) -> TermConfig {
        serde_json::from_str(&format!(
            r#"{{
                "term": "test",
                "label": "Intersession 2026",
                "fees": {{ "hairDryer": 1500, "airFryer": 2000 }},
                "documents": [{{ "code": "ADF", "template": "adf.pdf", "placements": {placements} }}]
            }}"#
        ))
        .unwrap()
    }

    fn record(fields: &[(&str, &str)]) -> ApplicantRecord {
        let mut form = ApplicantForm::new();
        for (name, value) in fields {
            form.set_field(name, *value).unwrap();
        }
        form.toggle_appliance("hairDryer");
        form.toggle_appliance("airFryer");
        form.finalize().unwrap()
    }

    #[test]
    fn test_centered_text_uses_measured_width() {
        let term = term(
            r#"[{ "type": "text", "field": "studentFirstName", "anchor": "center",
                  "position": { "x": 300, "y": 640 } }]"#,
        );
        let ops = Stamper::new(&term)
            .plan(&term.documents[0], &blank_pdf(1), &record(&[("studentFirstName", "Juan")]))
            .unwrap();

        assert_eq!(ops.len(), 1);
        let DrawContent::Text { width, .. } = &ops[0].content else {
            panic!("Expected text op");
        };
        assert!((width - 21.68).abs() < 1e-4);
        assert!((ops[0].x - (300.0 - width / 2.0)).abs() < 1e-9);
        assert_eq!(ops[0].y, 640.0);
    }

    #[test]
    fn test_top_origin_converted() {
        let term = term(
            r#"[{ "type": "text", "field": "room", "position": { "x": 72, "y": 100, "origin": "top" } }]"#,
        );
        let ops = Stamper::new(&term)
            .plan(&term.documents[0], &blank_pdf(1), &record(&[("room", "214")]))
            .unwrap();

        assert_eq!((ops[0].x, ops[0].y), (72.0, 692.0));
    }

    #[test]
    fn test_fee_total_and_static_label() {
        let term = term(
            r#"[
                { "type": "text", "field": "feeTotal", "anchor": "right", "position": { "x": 540, "y": 200 } },
                { "type": "text", "field": "static", "text": "Term: {label}", "position": { "x": 72, "y": 760 } }
            ]"#,
        );
        let ops = Stamper::new(&term)
            .plan(&term.documents[0], &blank_pdf(1), &record(&[("otherAppliancesCost", "250")]))
            .unwrap();

        let texts: Vec<&str> = ops
            .iter()
            .map(|op| match &op.content {
                DrawContent::Text { text, .. } => text.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(texts, vec!["3,750", "Term: Intersession 2026"]);
    }

    #[test]
    fn test_marks_follow_selection() {
        let term = term(
            r#"[
                { "type": "mark", "key": "hairDryer", "position": { "x": 60, "y": 500 } },
                { "type": "mark", "key": "riceCooker", "position": { "x": 60, "y": 480 } },
                { "type": "mark", "key": "dataPrivacy", "group": "consent", "position": { "x": 60, "y": 460 } }
            ]"#,
        );
        let ops = Stamper::new(&term)
            .plan(&term.documents[0], &blank_pdf(1), &record(&[]))
            .unwrap();

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].y, 500.0);
    }

    #[test]
    fn test_empty_values_draw_nothing() {
        let term = term(
            r#"[
                { "type": "text", "field": "parentEmail", "position": { "x": 72, "y": 300 } },
                { "type": "text", "field": "submissionDate", "position": { "x": 72, "y": 280 } },
                { "type": "signature", "position": { "x": 380, "y": 96 } }
            ]"#,
        );
        let ops = Stamper::new(&term)
            .plan(&term.documents[0], &blank_pdf(1), &record(&[]))
            .unwrap();

        assert!(ops.is_empty());
    }

    #[test]
    fn test_page_out_of_range() {
        let term = term(r#"[{ "type": "text", "field": "room", "page": 1, "position": { "x": 72, "y": 72 } }]"#);
        let result = Stamper::new(&term).stamp(&term.documents[0], &blank_pdf(1), &record(&[]));

        match result {
            Err(FormsError::PageOutOfRange { document, page, page_count }) => {
                assert_eq!((document.as_str(), page, page_count), ("ADF", 1, 1));
            }
            other => panic!("Expected PageOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_anchor_outside_page() {
        let term = term(r#"[{ "type": "text", "field": "room", "position": { "x": 700, "y": 72 } }]"#);
        let result = Stamper::new(&term).plan(&term.documents[0], &blank_pdf(1), &record(&[]));

        assert!(matches!(result, Err(FormsError::OutOfBounds { page: 0, .. })));
    }

    #[test]
    fn test_font_color_applied_to_text() {
        let mut term = term(r#"[{ "type": "text", "field": "room", "position": { "x": 72, "y": 72 } }]"#);
        term.font.color = [0, 0, 255];

        let pdf = Stamper::new(&term)
            .stamp(&term.documents[0], &blank_pdf(1), &record(&[("room", "214")]))
            .unwrap();

        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        let page_id = doc.get_pages()[&1];
        let content = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();
        assert!(content.contains("0 0 1 rg"));
    }

    #[test]
    fn test_truetype_font_requires_data() {
        let mut term = term("[]");
        term.font.family = "Sarabun".to_string();
        term.font.source = Some("fonts/sarabun.ttf".to_string());

        let result = Stamper::new(&term).plan(&term.documents[0], &blank_pdf(1), &record(&[]));
        assert!(matches!(result, Err(FormsError::TemplateUnavailable { .. })));
    }
}
