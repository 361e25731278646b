//! Stamp font selection and embedding.
//!
//! Stamps use WinAnsi-encoded single-byte text, so both the standard Courier
//! fallback and an embedded TrueType program are simple fonts with a
//! `FirstChar`..`LastChar` width table.

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

const FIRST_CHAR: u8 = 32;
const LAST_CHAR: u8 = 255;
/// Every Courier glyph advances 600/1000 em.
const COURIER_ADVANCE: u16 = 600;
const FALLBACK_NAME: &str = "EmbeddedStampFont";

/// Font used to draw the stamps.
#[derive(Debug, Clone)]
pub enum StampFont {
    /// Standard 14 Courier, never embedded.
    Courier,
    /// A parsed TrueType program embedded into every output.
    TrueType(TrueTypeFont),
}

/// Metrics extracted from a TrueType program, in 1/1000 em.
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    name: String,
    program: Vec<u8>,
    widths: Vec<u16>,
    ascent: i64,
    descent: i64,
    cap_height: i64,
    bbox: [i64; 4],
    fixed_pitch: bool,
}

impl StampFont {
    /// Use the TrueType program when present and parseable, else Courier.
    pub fn resolve(program: Option<&[u8]>) -> Self {
        match program {
            None => Self::Courier,
            Some(bytes) => match TrueTypeFont::parse(bytes) {
                Ok(font) => {
                    debug!(font = %font.name, "Using embedded stamp font");
                    Self::TrueType(font)
                }
                Err(e) => {
                    warn!(error = %e, "Custom font unusable, falling back to Courier");
                    Self::Courier
                }
            },
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::TrueType(_))
    }

    /// Width of `text` in points at `size`.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|code| u32::from(self.advance(code)))
            .sum();
        units as f32 * size / 1000.0
    }

    fn advance(&self, code: u8) -> u16 {
        match self {
            Self::Courier => COURIER_ADVANCE,
            Self::TrueType(font) => code
                .checked_sub(FIRST_CHAR)
                .and_then(|idx| font.widths.get(usize::from(idx)).copied())
                .unwrap_or(0),
        }
    }

    /// Add the font dictionary (and program, if any) to `doc`.
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        match self {
            Self::Courier => doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Courier",
                "Encoding" => "WinAnsiEncoding",
            }),
            Self::TrueType(font) => font.embed(doc),
        }
    }
}

impl TrueTypeFont {
    fn parse(bytes: &[u8]) -> Result<Self, String> {
        let face = ttf_parser::Face::parse(bytes, 0).map_err(|e| e.to_string())?;

        let units_per_em = f64::from(face.units_per_em());
        if units_per_em <= 0.0 {
            return Err("font reports zero units per em".to_string());
        }
        let scale = |v: i16| (f64::from(v) * 1000.0 / units_per_em).round() as i64;

        let widths = (FIRST_CHAR..=LAST_CHAR)
            .map(|code| {
                win_ansi_char(code)
                    .and_then(|c| face.glyph_index(c))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| (f64::from(adv) * 1000.0 / units_per_em).round() as u16)
                    .unwrap_or(0)
            })
            .collect();

        let bbox = face.global_bounding_box();
        let name = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .map(|n| sanitize_font_name(&n))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| FALLBACK_NAME.to_string());

        Ok(Self {
            name,
            program: bytes.to_vec(),
            widths,
            ascent: scale(face.ascender()),
            descent: scale(face.descender()),
            cap_height: face.capital_height().map(scale).unwrap_or_else(|| scale(face.ascender())),
            bbox: [
                scale(bbox.x_min),
                scale(bbox.y_min),
                scale(bbox.x_max),
                scale(bbox.y_max),
            ],
            fixed_pitch: face.is_monospaced(),
        })
    }

    fn embed(&self, doc: &mut Document) -> ObjectId {
        let program_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => self.program.len() as i64 },
            self.program.clone(),
        ));

        // Nonsymbolic, plus FixedPitch for monospaced faces
        let flags: i64 = if self.fixed_pitch { 32 | 1 } else { 32 };
        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(self.name.clone().into_bytes()),
            "Flags" => flags,
            "FontBBox" => self.bbox.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
            "ItalicAngle" => 0,
            "Ascent" => self.ascent,
            "Descent" => self.descent,
            "CapHeight" => self.cap_height,
            "StemV" => 80,
            "FontFile2" => Object::Reference(program_id),
        });

        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => Object::Name(self.name.clone().into_bytes()),
            "FirstChar" => i64::from(FIRST_CHAR),
            "LastChar" => i64::from(LAST_CHAR),
            "Widths" => self.widths.iter().map(|w| Object::Integer(i64::from(*w))).collect::<Vec<_>>(),
            "FontDescriptor" => Object::Reference(descriptor_id),
            "Encoding" => "WinAnsiEncoding",
        })
    }
}

/// Encode text as WinAnsi bytes; unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            cp @ 0x20..=0x7E | cp @ 0xA0..=0xFF => cp as u8,
            _ => b'?',
        })
        .collect()
}

/// Printable characters shared by WinAnsi and Latin-1.
fn win_ansi_char(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(char::from(code)),
        _ => None,
    }
}

fn sanitize_font_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_program_uses_courier() {
        assert!(matches!(StampFont::resolve(None), StampFont::Courier));
    }

    #[test]
    fn test_garbage_program_falls_back() {
        let font = StampFont::resolve(Some(b"definitely not a font"));
        assert!(!font.is_embedded());
    }

    #[test]
    fn test_courier_width() {
        let width = StampFont::Courier.text_width("abcd", 10.0);
        assert!((width - 24.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("a@b.c"), b"a@b.c".to_vec());
        assert_eq!(encode_win_ansi("José"), vec![b'J', b'o', b's', 0xE9]);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn test_courier_embeds_standard_dictionary() {
        let mut doc = Document::with_version("1.5");
        let id = StampFont::Courier.embed(&mut doc);

        let dict = doc.get_dictionary(id).unwrap();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Courier");
        assert!(dict.get(b"FontDescriptor").is_err());
    }

    #[test]
    fn test_sanitize_font_name() {
        assert_eq!(sanitize_font_name("IBM Plex Mono/Regular"), "IBMPlexMonoRegular");
    }
}
