//! PDF watermarking.
//!
//! Every page of the template gets two identifying text lines (bottom-left
//! and top-right) and, optionally, a faint diagonal copy of the buyer's
//! e-mail. Placement is computed from each page's own MediaBox, so mixed
//! page sizes are stamped correctly. The document Info dictionary is
//! rewritten to carry the order and licensee.

pub mod font;
pub mod layout;

pub use font::{encode_win_ansi, StampFont};
pub use layout::{stamp_layout, PageBox, PlacedStamp};

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::types::WatermarkSpec;
use crate::{Error, Result};

const FONT_RESOURCE: &str = "WmStampFont";
const GSTATE_RESOURCE: &str = "WmStampGs";
/// Upper bound on `Parent` hops when resolving inherited page attributes.
const MAX_TREE_DEPTH: usize = 64;

pub const DEFAULT_AUTHOR: &str = "DIY Furniture Project";
const DEFAULT_CREATOR: &str = "DIY Furniture Project Fulfillment";

/// Renderer settings that do not vary per order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub author: String,
    pub creator: String,
    pub producer: String,
    /// Draw the diagonal e-mail deterrent.
    pub diagonal: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            author: DEFAULT_AUTHOR.to_string(),
            creator: DEFAULT_CREATOR.to_string(),
            producer: format!("fulfillment-core {}", env!("CARGO_PKG_VERSION")),
            diagonal: true,
        }
    }
}

/// Stamps templates. Pure: no I/O, same output for the same inputs.
#[derive(Debug, Clone, Default)]
pub struct WatermarkRenderer {
    options: RenderOptions,
}

impl WatermarkRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render with the Courier fallback font.
    pub fn render(&self, template: &[u8], spec: &WatermarkSpec) -> Result<Vec<u8>> {
        self.render_with_font(template, spec, None)
    }

    /// Render, embedding `font_program` when it parses as TrueType.
    pub fn render_with_font(
        &self,
        template: &[u8],
        spec: &WatermarkSpec,
        font_program: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let mut doc =
            Document::load_mem(template).map_err(|e| Error::TemplateLoad(e.to_string()))?;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(Error::TemplateLoad("template has no pages".to_string()));
        }

        let font = StampFont::resolve(font_program);
        let font_id = font.embed(&mut doc);
        let gstate_id = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => layout::DIAGONAL_OPACITY,
            "CA" => layout::DIAGONAL_OPACITY,
        });
        let save_state_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));

        for page_id in &pages {
            let page_box = media_box(&doc, *page_id);
            let stamps = stamp_layout(page_box, &font, spec, self.options.diagonal);
            let stamp_id = doc.add_object(Stream::new(dictionary! {}, stamp_content(&stamps)?));

            let resources = merged_resources(&doc, *page_id, font_id, gstate_id);
            let contents = wrapped_contents(&mut doc, *page_id, save_state_id, stamp_id)?;

            let page = doc.get_dictionary_mut(*page_id)?;
            page.set("Resources", resources);
            page.set("Contents", contents);
        }

        self.write_info(&mut doc, spec);

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| Error::Render { message: e.to_string() })?;

        debug!(
            order_id = %spec.order_id,
            pages = pages.len(),
            embedded_font = font.is_embedded(),
            size = out.len(),
            "Template watermarked"
        );
        Ok(out)
    }

    fn write_info(&self, doc: &mut Document, spec: &WatermarkSpec) {
        let mut info = doc
            .trailer
            .get(b"Info")
            .ok()
            .map(|obj| deref(doc, obj))
            .and_then(|obj| obj.as_dict().ok())
            .cloned()
            .unwrap_or_default();

        let created = pdf_date(spec.issued_at);
        info.set("Title", text_string(&format!("Furniture Plans - Order {}", spec.order_id)));
        info.set("Author", text_string(&self.options.author));
        info.set("Subject", text_string(&format!("Licensed to: {}", spec.customer_email)));
        info.set(
            "Keywords",
            text_string(&format!("{}, {}", spec.order_id, spec.customer_email)),
        );
        info.set("Creator", text_string(&self.options.creator));
        info.set("Producer", text_string(&self.options.producer));
        info.set("CreationDate", text_string(&created));
        info.set("ModDate", text_string(&created));

        let info_id = doc.add_object(info);
        doc.trailer.set("Info", Object::Reference(info_id));
    }
}

/// Content stream drawing `stamps`. It opens with `Q` to close the `q`
/// pushed in front of the template's own content.
fn stamp_content(stamps: &[PlacedStamp]) -> Result<Vec<u8>> {
    let mut operations = vec![Operation::new("Q", vec![])];

    for stamp in stamps {
        let (sin, cos) = stamp.angle_deg.to_radians().sin_cos();
        if stamp.opacity.is_some() {
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new("gs", vec![Object::Name(GSTATE_RESOURCE.into())]));
        }
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_RESOURCE.into()), stamp.size.into()],
            ),
            Operation::new("rg", vec![stamp.gray.into(), stamp.gray.into(), stamp.gray.into()]),
            Operation::new(
                "Tm",
                vec![
                    cos.into(),
                    sin.into(),
                    (-sin).into(),
                    cos.into(),
                    stamp.x.into(),
                    stamp.y.into(),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&stamp.text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
        if stamp.opacity.is_some() {
            operations.push(Operation::new("Q", vec![]));
        }
    }

    // Leading newline keeps the first operator apart from the template's last token
    let mut stream = b"\n".to_vec();
    stream.extend(
        Content { operations }
            .encode()
            .map_err(|e| Error::Render { message: e.to_string() })?,
    );
    Ok(stream)
}

/// Page contents become `[q, <original streams...>, stamps]`.
fn wrapped_contents(
    doc: &mut Document,
    page_id: ObjectId,
    save_state_id: ObjectId,
    stamp_id: ObjectId,
) -> Result<Object> {
    let existing = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();

    let mut original = match existing {
        None => Vec::new(),
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(Object::Array(items)) => items,
        Some(Object::Stream(stream)) => vec![Object::Reference(doc.add_object(stream))],
        Some(other) => {
            return Err(Error::TemplateLoad(format!(
                "unsupported page contents: {:?}",
                other
            )))
        }
    };

    let mut contents = Vec::with_capacity(original.len() + 2);
    contents.push(Object::Reference(save_state_id));
    contents.append(&mut original);
    contents.push(Object::Reference(stamp_id));
    Ok(Object::Array(contents))
}

/// Page resources (own or inherited) copied into a direct dictionary with
/// the stamp font and graphics state added.
fn merged_resources(
    doc: &Document,
    page_id: ObjectId,
    font_id: ObjectId,
    gstate_id: ObjectId,
) -> Dictionary {
    let mut resources = inherited(doc, page_id, b"Resources")
        .map(|obj| deref(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    let mut fonts = sub_dictionary(doc, &resources, b"Font");
    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    resources.set("Font", fonts);

    let mut states = sub_dictionary(doc, &resources, b"ExtGState");
    states.set(GSTATE_RESOURCE, Object::Reference(gstate_id));
    resources.set("ExtGState", states);

    resources
}

fn sub_dictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .map(|obj| deref(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default()
}

/// The page's MediaBox, walking up the page tree; US Letter when absent.
fn media_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let corners: Option<Vec<f32>> = inherited(doc, page_id, b"MediaBox")
        .map(|obj| deref(doc, obj))
        .and_then(|obj| obj.as_array().ok())
        .and_then(|items| items.iter().map(|item| number(deref(doc, item))).collect());

    match corners.as_deref() {
        Some([a, b, c, d]) if a != c && b != d => PageBox::from_corners(*a, *b, *c, *d),
        _ => PageBox::LETTER,
    }
}

fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let dict = node?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        node = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .ok()
            .and_then(|parent| doc.get_dictionary(parent).ok());
    }
    None
}

/// Follow one level of indirection; dangling references stay as-is.
fn deref<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// PDF text string: literal for ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// `D:YYYYMMDDHHmmSSZ`
fn pdf_date(at: DateTime<Utc>) -> String {
    at.format("D:%Y%m%d%H%M%SZ").to_string()
}
