//! PDF fixtures and inspection helpers for tests.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Font resource name used by generated templates.
pub const TEMPLATE_FONT: &str = "F1";

/// A stamp text run read back from a rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct StampRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Build a template with one page per `(width, height)`.
///
/// Resources sit on the page tree root so pages inherit them; each page
/// carries its own MediaBox and a small text content stream.
pub fn template_pdf(page_sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::with_capacity(page_sizes.len());
    for (index, (width, height)) in page_sizes.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![TEMPLATE_FONT.into(), 12.into()]),
                Operation::new("Td", vec![72.into(), (height - 72.0).into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Plan sheet {}", index + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("fixture content encodes"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (*width).into(), (*height).into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => dictionary! {
                "Font" => dictionary! { TEMPLATE_FONT => font_id },
            },
        }),
    );
    finish(doc, pages_id)
}

/// A structurally valid PDF whose page tree is empty.
pub fn empty_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<Object>::new(),
        "Count" => 0,
    });
    finish(doc, pages_id)
}

fn finish(mut doc: Document, pages_id: lopdf::ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("fixture saves");
    out
}

/// Text runs positioned with `Tm` on a 1-based page.
///
/// Template text is positioned with `Td`, so only stamps are returned.
pub fn page_stamps(doc: &Document, page_number: u32) -> Vec<StampRun> {
    let page_id = doc.get_pages()[&page_number];
    let content = doc.get_page_content(page_id).expect("page content");
    let operations = Content::decode(&content).expect("content decodes").operations;

    let mut runs = Vec::new();
    let mut matrix: Option<(f32, f32)> = None;
    for op in operations {
        match op.operator.as_str() {
            "BT" => matrix = None,
            "Tm" if op.operands.len() == 6 => {
                matrix = number(&op.operands[4]).zip(number(&op.operands[5]));
            }
            "Tj" => {
                if let (Some((x, y)), Some(Object::String(bytes, _))) = (matrix, op.operands.first()) {
                    runs.push(StampRun {
                        text: bytes.iter().map(|b| char::from(*b)).collect(),
                        x,
                        y,
                    });
                }
            }
            _ => {}
        }
    }
    runs
}

/// Stamp runs for every page, in page order.
pub fn all_page_stamps(pdf: &[u8]) -> Vec<Vec<StampRun>> {
    let doc = Document::load_mem(pdf).expect("rendered PDF loads");
    let count = doc.get_pages().len() as u32;
    (1..=count).map(|page| page_stamps(&doc, page)).collect()
}

/// Info dictionary entries decoded as text.
pub fn info_strings(doc: &Document) -> HashMap<String, String> {
    let info = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_dictionary(id))
        .expect("info dictionary");

    info.iter()
        .filter_map(|(key, value)| match value {
            Object::String(bytes, _) => Some((
                String::from_utf8_lossy(key).into_owned(),
                decode_text(bytes),
            )),
            _ => None,
        })
        .collect()
}

fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}
