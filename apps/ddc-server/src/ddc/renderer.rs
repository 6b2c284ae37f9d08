//! Card rendering on top of lopdf
//!
//! Page layout is deliberately plain: text in the base-14 Helvetica family,
//! the pages of an embedded PDF imported as form XObjects, and one or more
//! pages per signature. The original document and the signatures travel as
//! entries of the `EmbeddedFiles` name tree, keyed so that readers list them
//! in attachment order.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::error::{DdcError, Result};
use super::text::{wrap, Canvas, Font};
use super::translations::{Language, Phrase};
use super::types::{BuildOptions, SignatureInfo, SignerIdentity};
use super::{DocumentRenderer, RenderRequest};

// ============================================================================
// Page Geometry (A4, points)
// ============================================================================

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 40.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const TOP: f32 = 790.0;
const BOTTOM: f32 = 70.0;
const FOOTER_RULE: f32 = 55.0;
const FOOTER_TEXT: f32 = 42.0;
const HEADER_TEXT: f32 = 815.0;

const DEFAULT_BOX: [f32; 4] = [0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT];

/// Resource name of the imported page on a document visualization page
const PAGE_FORM: &str = "Pg";

/// Everything that is not a PDF starts with something other than this
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// lopdf-backed [`DocumentRenderer`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn render(&self, request: &RenderRequest) -> Result<Vec<u8>> {
        validate(request)?;

        let lang = Language::from_code(&request.info.language);
        let options = &request.options;
        let mut card = Card::new();

        let imported = if options.visualize_document {
            card.import_pages(&request.document)?
        } else {
            Vec::new()
        };

        let signature_pages = if options.visualize_signatures {
            signature_section(lang, &request.info.signatures)?
        } else {
            Vec::new()
        };

        // Contents entries never change the info block length, so one
        // dry run is enough to learn where the other sections start.
        let dry_run = info_section(lang, request, &contents(lang, options, 0, 0));
        let document_start = dry_run.len() + 1;
        let signatures_start = document_start + imported.len();
        let info_pages = info_section(
            lang,
            request,
            &contents(lang, options, document_start, signatures_start),
        );

        let total = info_pages.len() + imported.len() + signature_pages.len();
        let title = request.info.title.as_str();
        let mut number = 0;

        for canvas in info_pages {
            number += 1;
            card.add_page(decorate(canvas, lang, title, number, total), None);
        }

        for page in &imported {
            number += 1;
            let canvas = document_page(lang, page);
            card.add_page(decorate(canvas, lang, title, number, total), Some(page.form_id));
        }

        for canvas in signature_pages {
            number += 1;
            card.add_page(decorate(canvas, lang, title, number, total), None);
        }

        card.attach(
            &request.file_name,
            &request.document,
            &lang.text(Phrase::OriginalDocument),
        );
        for signature in &request.info.signatures {
            let description =
                lang.format(Phrase::SignatureAttachment, &[("signer", &signer_label(lang, signature))]);
            card.attach(&signature.file_name, &signature.body, &description);
        }

        tracing::debug!(
            pages = total,
            attachments = request.info.signatures.len() + 1,
            "Rendered document card"
        );

        card.finish(request)
    }
}

fn validate(request: &RenderRequest) -> Result<()> {
    if request.file_name.trim().is_empty() {
        return Err(DdcError::Validation("document file name not provided".to_string()));
    }

    if request.info.signatures.is_empty() {
        return Err(DdcError::Validation("no signatures provided".to_string()));
    }

    for (index, signature) in request.info.signatures.iter().enumerate() {
        let number = index + 1;
        if signature.file_name.trim().is_empty() {
            return Err(DdcError::Validation(format!(
                "signature #{}: signature file name not provided",
                number
            )));
        }
        if signature.signer_identity().is_none() {
            return Err(DdcError::Validation(format!(
                "signature #{}: subject ID not provided",
                number
            )));
        }
        if request.options.visualize_signatures && signature.signature_visualization.is_none() {
            return Err(DdcError::Validation(format!(
                "signature #{}: no signature visualization information provided",
                number
            )));
        }
    }

    if request.options.visualize_document && !is_pdf(&request.document) {
        return Err(DdcError::Validation(
            "visualization of non-PDF files is not available".to_string(),
        ));
    }

    Ok(())
}

fn signer_label(lang: Language, signature: &SignatureInfo) -> String {
    match signature.signer_identity() {
        Some(SignerIdentity::Name(name)) => name.to_string(),
        Some(SignerIdentity::SubjectId(id)) => lang.format(Phrase::Iin, &[("id", id)]),
        None => String::new(),
    }
}

// ============================================================================
// Text Flow
// ============================================================================

/// Top-to-bottom text layout that breaks pages as it goes
struct Flow {
    pages: Vec<Canvas>,
    canvas: Canvas,
    y: f32,
}

impl Flow {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            canvas: Canvas::new(),
            y: TOP,
        }
    }

    fn break_page(&mut self) {
        let done = std::mem::take(&mut self.canvas);
        self.pages.push(done);
        self.y = TOP;
    }

    fn next_line(&mut self, leading: f32) -> f32 {
        if self.y < BOTTOM {
            self.break_page();
        }
        let y = self.y;
        self.y -= leading;
        y
    }

    fn paragraph(&mut self, font: Font, size: f32, indent: f32, text: &str) {
        for line in wrap(text, font, size, CONTENT_WIDTH - indent) {
            let y = self.next_line(size * 1.3);
            if !line.is_empty() {
                self.canvas.text(MARGIN + indent, y, font, size, &line);
            }
        }
    }

    /// Contents line with the page number in the right column
    fn entry(&mut self, text: &str, page: usize) {
        let size = 10.0;
        let mut first = true;
        for line in wrap(text, Font::Regular, size, CONTENT_WIDTH - 60.0) {
            let y = self.next_line(size * 1.3);
            self.canvas.text(MARGIN + 10.0, y, Font::Regular, size, &line);
            if first {
                self.canvas
                    .text(PAGE_WIDTH - MARGIN - 30.0, y, Font::Regular, size, &page.to_string());
                first = false;
            }
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn finish(mut self) -> Vec<Canvas> {
        self.pages.push(self.canvas);
        self.pages
    }
}

// ============================================================================
// Sections
// ============================================================================

fn contents(
    lang: Language,
    options: &BuildOptions,
    document_start: usize,
    signatures_start: usize,
) -> Vec<(String, usize)> {
    let mut entries = vec![(lang.text(Phrase::InfoBlock), 1)];
    if options.visualize_document {
        entries.push((lang.text(Phrase::DocumentVisualization), document_start));
    }
    if options.visualize_signatures {
        entries.push((lang.text(Phrase::SignaturesVisualization), signatures_start));
    }
    entries
}

fn info_section(lang: Language, request: &RenderRequest, contents: &[(String, usize)]) -> Vec<Canvas> {
    let info = &request.info;
    let options = &request.options;
    let mut flow = Flow::new();

    flow.paragraph(Font::Bold, 14.0, 0.0, &lang.text(Phrase::CardTitle));
    flow.gap(8.0);
    flow.paragraph(Font::Bold, 12.0, 0.0, &info.title);
    if !info.description.is_empty() {
        flow.paragraph(Font::Regular, 10.0, 0.0, &info.description);
    }
    if !info.id.is_empty() {
        flow.paragraph(Font::Regular, 10.0, 0.0, &format!("ID: {}", info.id));
    }
    flow.gap(6.0);

    flow.paragraph(
        Font::Regular,
        10.0,
        0.0,
        &format!("{}: {}", lang.text(Phrase::CreationDate), options.creation_date),
    );
    flow.paragraph(
        Font::Regular,
        10.0,
        0.0,
        &format!("{}: {}", lang.text(Phrase::BuilderSystem), options.builder_name),
    );
    if !info.sub_builder_logo_string.is_empty() {
        flow.paragraph(Font::Italic, 9.0, 0.0, &info.sub_builder_logo_string);
    }
    flow.gap(10.0);

    flow.paragraph(Font::Bold, 11.0, 0.0, &lang.text(Phrase::Contents));
    for (title, page) in contents {
        flow.entry(title, *page);
    }
    flow.gap(10.0);

    flow.paragraph(Font::Bold, 11.0, 0.0, &lang.text(Phrase::AttachmentsList));
    flow.paragraph(
        Font::Regular,
        10.0,
        10.0,
        &format!("1. {} - {}", request.file_name, lang.text(Phrase::OriginalDocument)),
    );
    for (index, signature) in info.signatures.iter().enumerate() {
        let description =
            lang.format(Phrase::SignatureAttachment, &[("signer", &signer_label(lang, signature))]);
        flow.paragraph(
            Font::Regular,
            10.0,
            10.0,
            &format!("{}. {} - {}", index + 2, signature.file_name, description),
        );
    }
    flow.gap(10.0);

    let notice = lang.format(Phrase::Notice, &[("how_to_verify", &options.how_to_verify)]);
    flow.paragraph(Font::Italic, 9.0, 0.0, &notice);

    flow.finish()
}

fn signature_section(lang: Language, signatures: &[SignatureInfo]) -> Result<Vec<Canvas>> {
    let mut flow = Flow::new();

    for (index, signature) in signatures.iter().enumerate() {
        let vis = signature.signature_visualization.as_ref().ok_or_else(|| {
            DdcError::Validation(format!(
                "signature #{}: no signature visualization information provided",
                index + 1
            ))
        })?;

        if index > 0 {
            flow.break_page();
        }

        flow.paragraph(Font::Bold, 12.0, 0.0, &lang.text(Phrase::SignatureVisualization));
        flow.paragraph(
            Font::Bold,
            11.0,
            0.0,
            &lang.format(Phrase::SignatureNumber, &[("number", &(index + 1).to_string())]),
        );
        flow.gap(6.0);

        let mut field = |label: Phrase, value: &str| {
            if value.is_empty() {
                return;
            }
            flow.paragraph(Font::Bold, 10.0, 0.0, &lang.text(label));
            flow.paragraph(Font::Regular, 10.0, 10.0, value);
        };

        field(Phrase::SignatureDate, &vis.tsp.generated_at);

        let mut signer = signer_label(lang, signature);
        if !vis.subject_id.is_empty() && !signer.contains(&vis.subject_id) {
            signer = format!("{}, {}", signer, lang.format(Phrase::Iin, &[("id", &vis.subject_id)]));
        }
        field(Phrase::SignedBy, &signer);

        if !vis.subject_org_name.is_empty() {
            let org = lang.format(
                Phrase::Organization,
                &[("name", &vis.subject_org_name), ("id", &vis.subject_org_id)],
            );
            field(Phrase::RepresentsOrganization, &org);
        }

        field(Phrase::Template, &vis.policies.join(", "));

        let usage: Vec<&str> = vis
            .key_usage
            .iter()
            .chain(vis.ext_key_usage.iter())
            .map(String::as_str)
            .collect();
        field(Phrase::AllowedUsage, &usage.join(", "));

        flow.gap(6.0);
        let certificate = lang.format(
            Phrase::CertificateDetails,
            &[
                ("subject", &vis.subject),
                ("alt_name", &vis.subject_alt_name),
                ("serial", &vis.serial_number),
                ("from", &vis.from),
                ("until", &vis.until),
                ("issuer", &vis.issuer),
            ],
        );
        flow.paragraph(Font::Regular, 8.0, 0.0, &certificate);
        if !vis.signature_algorithm.is_empty() {
            flow.paragraph(Font::Regular, 8.0, 0.0, &vis.signature_algorithm);
        }

        if !vis.tsp.generated_at.is_empty() {
            flow.gap(6.0);
            let tsp = lang.format(
                Phrase::TspDetails,
                &[
                    ("generated_at", &vis.tsp.generated_at),
                    ("subject", &vis.tsp.subject),
                    ("serial", &vis.tsp.serial_number),
                    ("issuer", &vis.tsp.issuer),
                ],
            );
            flow.paragraph(Font::Regular, 8.0, 0.0, &tsp);
        }

        if !vis.ocsp.generated_at.is_empty() {
            flow.gap(6.0);
            let ocsp = lang.format(
                Phrase::OcspDetails,
                &[
                    ("status", &vis.ocsp.cert_status),
                    ("generated_at", &vis.ocsp.generated_at),
                    ("subject", &vis.ocsp.subject),
                    ("serial", &vis.ocsp.serial_number),
                    ("issuer", &vis.ocsp.issuer),
                ],
            );
            flow.paragraph(Font::Regular, 8.0, 0.0, &ocsp);
        }
    }

    Ok(flow.finish())
}

fn document_page(lang: Language, page: &ImportedPage) -> Canvas {
    let mut canvas = Canvas::new();
    canvas.text(MARGIN, TOP, Font::Bold, 11.0, &lang.text(Phrase::DocumentVisualization));

    let [llx, lly, urx, ury] = page.bbox;
    let (width, height) = ((urx - llx).max(1.0), (ury - lly).max(1.0));
    let area_top = TOP - 15.0;
    let area_height = area_top - BOTTOM;
    let scale = (CONTENT_WIDTH / width).min(area_height / height);

    let placed_width = width * scale;
    let placed_height = height * scale;
    let x = MARGIN + (CONTENT_WIDTH - placed_width) / 2.0;
    let y = BOTTOM + (area_height - placed_height) / 2.0;

    canvas.form(PAGE_FORM, scale, x - llx * scale, y - lly * scale);
    canvas.rect(x, y, placed_width, placed_height);
    canvas.watermark(
        x + placed_width * 0.15,
        y + placed_height * 0.25,
        28.0,
        45.0,
        &lang.text(Phrase::DocumentCopy).to_uppercase(),
    );

    canvas
}

/// Running header and footer shared by every page
fn decorate(mut canvas: Canvas, lang: Language, title: &str, number: usize, total: usize) -> Canvas {
    if let Some(first_line) = wrap(title, Font::Italic, 8.0, CONTENT_WIDTH).into_iter().next() {
        canvas.text(MARGIN, HEADER_TEXT, Font::Italic, 8.0, &first_line);
    }
    canvas.line(MARGIN, FOOTER_RULE, PAGE_WIDTH - MARGIN, FOOTER_RULE);
    canvas.text(MARGIN, FOOTER_TEXT, Font::Italic, 8.0, &lang.text(Phrase::CardFooter));
    let page_number = lang.format(
        Phrase::PageNumber,
        &[("page", &number.to_string()), ("total", &total.to_string())],
    );
    canvas.text(PAGE_WIDTH - MARGIN - 110.0, FOOTER_TEXT, Font::Regular, 8.0, &page_number);
    canvas
}

// ============================================================================
// PDF Assembly
// ============================================================================

struct ImportedPage {
    form_id: ObjectId,
    bbox: [f32; 4],
}

struct Card {
    doc: Document,
    pages_id: ObjectId,
    fonts_id: ObjectId,
    kids: Vec<Object>,
    attachments: Vec<Object>,
}

impl Card {
    fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in Font::ALL {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }
        let fonts_id = doc.add_object(fonts);

        Self {
            doc,
            pages_id,
            fonts_id,
            kids: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Move every page of `pdf` into the card as a form XObject
    fn import_pages(&mut self, pdf: &[u8]) -> Result<Vec<ImportedPage>> {
        let mut embedded = Document::load_mem(pdf)?;
        embedded.renumber_objects_with(self.doc.max_id + 1);

        let page_ids: Vec<ObjectId> = embedded.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(DdcError::Validation("document is empty".to_string()));
        }

        let mut forms = Vec::with_capacity(page_ids.len());
        for page_id in page_ids {
            let content = embedded.get_page_content(page_id)?;
            let media_box = inherited(&embedded, page_id, b"MediaBox")
                .and_then(|obj| embedded.dereference(obj).ok())
                .map(|(_, obj)| obj.clone());
            let resources = inherited(&embedded, page_id, b"Resources")
                .cloned()
                .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));
            let bbox = media_box.as_ref().and_then(parse_box).unwrap_or(DEFAULT_BOX);
            forms.push((content, bbox, resources));
        }

        let max_id = embedded
            .objects
            .keys()
            .map(|(id, _)| *id)
            .max()
            .unwrap_or(0);
        self.doc.max_id = self.doc.max_id.max(max_id);
        self.doc.objects.extend(embedded.objects);

        let imported = forms
            .into_iter()
            .map(|(content, bbox, resources)| {
                let dict = dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => box_object(bbox),
                    "Resources" => resources,
                };
                let form_id = self.doc.add_object(Stream::new(dict, content));
                ImportedPage { form_id, bbox }
            })
            .collect();

        Ok(imported)
    }

    fn add_page(&mut self, canvas: Canvas, form: Option<ObjectId>) {
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), canvas.into_bytes()));

        let mut resources = dictionary! { "Font" => self.fonts_id };
        if let Some(form_id) = form {
            resources.set("XObject", dictionary! { PAGE_FORM => form_id });
        }

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => box_object(DEFAULT_BOX),
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.kids.push(page_id.into());
    }

    fn attach(&mut self, name: &str, bytes: &[u8], description: &str) {
        let size = bytes.len() as i64;
        let file_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "EmbeddedFile",
                "Params" => dictionary! { "Size" => size },
            },
            bytes.to_vec(),
        ));

        let spec_id = self.doc.add_object(dictionary! {
            "Type" => "Filespec",
            "F" => Object::string_literal(super::text::to_win_ansi(name)),
            "UF" => text_string(name),
            "Desc" => text_string(description),
            "EF" => dictionary! { "F" => file_id },
        });

        // Zero-padded keys keep the name tree sorted in attachment order
        let key = format!("{:04}", self.attachments.len() / 2 + 1);
        self.attachments.push(Object::string_literal(key));
        self.attachments.push(spec_id.into());
    }

    fn finish(mut self, request: &RenderRequest) -> Result<Vec<u8>> {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );

        let embedded_files = self.doc.add_object(dictionary! { "Names" => self.attachments });
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
            "Names" => dictionary! { "EmbeddedFiles" => embedded_files },
            "PageMode" => "UseAttachments",
        });

        let created = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
        let info_id = self.doc.add_object(dictionary! {
            "Title" => text_string(&request.info.title),
            "Creator" => text_string(&request.options.builder_name),
            "Producer" => Object::string_literal(concat!("ddc-server ", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::string_literal(created),
        });

        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);
        self.doc.prune_objects();

        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }
}

/// Look up a page attribute, following `Parent` links for inherited ones
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // Bounded walk; malformed files can contain parent cycles
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(v) => Some(*v as f32),
        Object::Real(v) => Some(*v as f32),
        _ => None,
    }
}

fn parse_box(obj: &Object) -> Option<[f32; 4]> {
    let values = obj.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = number(value)?;
    }
    let [llx, lly, urx, ury] = out;
    Some([llx.min(urx), lly.min(ury), llx.max(urx), lly.max(ury)])
}

fn box_object(bbox: [f32; 4]) -> Object {
    Object::Array(
        bbox.iter()
            .map(|v| Object::Integer(v.round() as i64))
            .collect(),
    )
}

/// PDF text string: literal for ASCII, UTF-16BE with a byte order mark otherwise
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xfe, 0xff];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
