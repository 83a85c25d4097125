//! Font handling for PDF documents

use crate::metrics::{courier_width, helvetica_width, win_ansi_byte, REPLACEMENT_BYTE};
use crate::{PdfError, Result};
use lopdf::{Dictionary, Object, Stream};
use std::collections::BTreeSet;

/// Standard Type1 fonts every PDF viewer provides without embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StandardFont {
    #[default]
    Helvetica,
    Courier,
}

impl StandardFont {
    /// PostScript name, also used as the registration name
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::Courier => "Courier",
        }
    }

    /// Look up a standard font by its PostScript name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "helvetica" => Some(StandardFont::Helvetica),
            "courier" => Some(StandardFont::Courier),
            _ => None,
        }
    }

    fn byte_width(self, byte: u8) -> u16 {
        match self {
            StandardFont::Helvetica => helvetica_width(byte),
            StandardFont::Courier => courier_width(byte),
        }
    }

    fn encode(text: &str) -> impl Iterator<Item = u8> + '_ {
        text.chars()
            .map(|c| win_ansi_byte(c).unwrap_or(REPLACEMENT_BYTE))
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(self, text: &str, font_size: f32) -> f32 {
        let units: u32 = Self::encode(text)
            .map(|b| self.byte_width(b) as u32)
            .sum();
        units as f32 / 1000.0 * font_size
    }

    /// Encode text as a WinAnsi hex string for the Tj operator
    pub fn encode_text_hex(self, text: &str) -> String {
        let hex: String = Self::encode(text).map(|b| format!("{b:02X}")).collect();
        format!("<{hex}>")
    }

    /// Font dictionary referencing the built-in font
    pub fn to_pdf_object(self) -> Dictionary {
        Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type1".into()),
            ("BaseFont", self.base_font().into()),
            ("Encoding", "WinAnsiEncoding".into()),
        ])
    }
}

/// TrueType font embedded in full as a CIDFontType2 with Identity-H encoding
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    /// Registration name
    pub name: String,
    /// Raw TTF data
    ttf_data: Vec<u8>,
    /// Characters drawn so far (for /W and ToUnicode)
    used_chars: BTreeSet<char>,
}

/// PDF objects generated for font embedding
pub struct FontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// CIDFont Type2 dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary
    pub font_descriptor: Dictionary,
    /// Font file stream (TTF data)
    pub font_file_stream: Stream,
    /// ToUnicode CMap stream
    pub tounicode_stream: Stream,
}

impl TrueTypeFont {
    /// Create font data from TTF bytes
    ///
    /// The data is parsed once to reject invalid fonts early; glyph lookups
    /// re-parse the face from the owned bytes.
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        ttf_parser::Face::parse(ttf_data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{name}: {e:?}")))?;

        Ok(Self {
            name: name.to_string(),
            ttf_data: ttf_data.to_vec(),
            used_chars: BTreeSet::new(),
        })
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.ttf_data, 0).ok()
    }

    /// Add characters to the used set
    pub fn add_chars(&mut self, text: &str) {
        self.used_chars.extend(text.chars());
    }

    /// Get glyph ID for a character
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.face()
            .and_then(|face| face.glyph_index(c).map(|id| id.0))
    }

    /// Get font units per em
    pub fn units_per_em(&self) -> u16 {
        self.face().map(|face| face.units_per_em()).unwrap_or(1000)
    }

    /// Get font ascender
    pub fn ascender(&self) -> i16 {
        self.face().map(|face| face.ascender()).unwrap_or(800)
    }

    /// Get font descender
    pub fn descender(&self) -> i16 {
        self.face().map(|face| face.descender()).unwrap_or(-200)
    }

    /// Calculate text width in font units
    pub fn text_width(&self, text: &str) -> u32 {
        let Some(face) = self.face() else {
            return 0;
        };
        text.chars()
            .filter_map(|c| face.glyph_index(c))
            .filter_map(|gid| face.glyph_hor_advance(gid))
            .map(|w| w as u32)
            .sum()
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        let width = self.text_width(text);
        let units_per_em = self.units_per_em() as f32;
        (width as f32 / units_per_em) * font_size
    }

    /// Encode text as hex glyph IDs for the Tj operator
    pub fn encode_text_hex(&self, text: &str) -> String {
        let face = self.face();
        let mut result = String::new();
        for c in text.chars() {
            let gid = face
                .as_ref()
                .and_then(|f| f.glyph_index(c))
                .map(|id| id.0)
                .unwrap_or(0);
            result.push_str(&format!("{gid:04X}"));
        }
        format!("<{result}>")
    }

    /// Generate all PDF objects needed to embed this font
    ///
    /// References between the objects are left as placeholders and wired up
    /// by the document when the objects are added.
    pub fn to_pdf_objects(&self) -> FontObjects {
        let font_name = Object::Name(self.name.clone().into_bytes());

        let tounicode_content = self.generate_tounicode_cmap();
        let tounicode_stream = Stream::new(Dictionary::new(), tounicode_content.into_bytes());

        let font_file_stream = Stream::new(
            Dictionary::from_iter(vec![("Length1", (self.ttf_data.len() as i64).into())]),
            self.ttf_data.clone(),
        );

        let units_per_em = self.units_per_em() as i64;
        let scale = |v: i16| v as i64 * 1000 / units_per_em.max(1);
        let ascent = scale(self.ascender());
        let descent = scale(self.descender());

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", 4.into()),
            (
                "FontBBox",
                vec![0.into(), descent.into(), 1000.into(), ascent.into()].into(),
            ),
            ("ItalicAngle", 0.into()),
            ("Ascent", ascent.into()),
            ("Descent", descent.into()),
            ("CapHeight", ascent.into()),
            ("StemV", 80.into()),
        ]);

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", 0.into()),
        ]);

        let cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "CIDFontType2".into()),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", cid_system_info.into()),
            ("CIDToGIDMap", "Identity".into()),
            ("W", self.generate_widths_array().into()),
            ("DW", 1000.into()),
        ]);

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            ("BaseFont", font_name),
            ("Encoding", "Identity-H".into()),
        ]);

        FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream,
            tounicode_stream,
        }
    }

    /// Generate /W array for the glyphs in use, scaled to 1/1000 em
    fn generate_widths_array(&self) -> Vec<Object> {
        let mut widths = Vec::new();
        let Some(face) = self.face() else {
            return widths;
        };
        let units_per_em = face.units_per_em().max(1) as i64;

        let mut gids: Vec<u16> = self
            .used_chars
            .iter()
            .filter_map(|&c| face.glyph_index(c).map(|id| id.0))
            .collect();
        gids.sort_unstable();
        gids.dedup();

        for gid in gids {
            let advance = face
                .glyph_hor_advance(ttf_parser::GlyphId(gid))
                .map(|a| a as i64 * 1000 / units_per_em)
                .unwrap_or(1000);
            widths.push((gid as i64).into());
            widths.push(vec![advance.into()].into());
        }

        widths
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self) -> String {
        let mut cmap = String::new();

        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        let chars: Vec<char> = self.used_chars.iter().copied().collect();
        // bfchar sections are limited to 100 entries
        for chunk in chars.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for c in chunk {
                let gid = self.glyph_id(*c).unwrap_or(0);
                let mut utf16 = [0u16; 2];
                let units: String = c
                    .encode_utf16(&mut utf16)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                cmap.push_str(&format!("<{gid:04X}> <{units}>\n"));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }
}

/// A font registered with a document
#[derive(Debug, Clone)]
pub enum Font {
    Standard(StandardFont),
    TrueType(TrueTypeFont),
}

impl Font {
    /// Width of `text` in points at `font_size`
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        match self {
            Font::Standard(font) => font.text_width_points(text, font_size),
            Font::TrueType(font) => font.text_width_points(text, font_size),
        }
    }

    /// Hex string operand for the Tj operator
    pub fn encode_text_hex(&self, text: &str) -> String {
        match self {
            Font::Standard(font) => font.encode_text_hex(text),
            Font::TrueType(font) => font.encode_text_hex(text),
        }
    }

    pub(crate) fn record_usage(&mut self, text: &str) {
        if let Font::TrueType(font) = self {
            font.add_chars(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unparsed_font() -> TrueTypeFont {
        TrueTypeFont {
            name: "test".to_string(),
            ttf_data: vec![0u8; 100],
            used_chars: BTreeSet::new(),
        }
    }

    #[test]
    fn test_standard_font_from_name() {
        assert_eq!(
            StandardFont::from_name("Helvetica"),
            Some(StandardFont::Helvetica)
        );
        assert_eq!(
            StandardFont::from_name("courier"),
            Some(StandardFont::Courier)
        );
        assert_eq!(StandardFont::from_name("Arial"), None);
    }

    #[test]
    fn test_helvetica_text_width() {
        // J(500) u(556) a(556) n(556) = 2168 units
        let width = StandardFont::Helvetica.text_width_points("Juan", 10.0);
        assert!((width - 21.68).abs() < 1e-4);
    }

    #[test]
    fn test_courier_text_width() {
        let width = StandardFont::Courier.text_width_points("1500", 12.0);
        assert!((width - 28.8).abs() < 1e-4);
    }

    #[test]
    fn test_standard_encode_text_hex() {
        assert_eq!(StandardFont::Helvetica.encode_text_hex("Hi/"), "<48692F>");
        assert_eq!(StandardFont::Helvetica.encode_text_hex("Peña"), "<5065F161>");
        assert_eq!(StandardFont::Helvetica.encode_text_hex("₱"), "<3F>");
        assert_eq!(StandardFont::Helvetica.encode_text_hex(""), "<>");
    }

    #[test]
    fn test_standard_font_dictionary() {
        let dict = StandardFont::Helvetica.to_pdf_object();
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type1");
        assert_eq!(
            dict.get(b"BaseFont").unwrap().as_name().unwrap(),
            b"Helvetica"
        );
        assert_eq!(
            dict.get(b"Encoding").unwrap().as_name().unwrap(),
            b"WinAnsiEncoding"
        );
    }

    #[test]
    fn test_from_ttf_rejects_garbage() {
        let result = TrueTypeFont::from_ttf("broken", &[0u8; 16]);
        assert!(matches!(result, Err(PdfError::FontParseError(_))));
    }

    #[test]
    fn test_add_chars() {
        let mut font = unparsed_font();
        assert!(font.used_chars.is_empty());

        font.add_chars("Hello");
        assert_eq!(font.used_chars.len(), 4);
        assert!(font.used_chars.contains(&'H'));
        assert!(font.used_chars.contains(&'l'));
    }

    #[test]
    fn test_unparsed_font_defaults() {
        let font = unparsed_font();
        assert_eq!(font.units_per_em(), 1000);
        assert_eq!(font.ascender(), 800);
        assert_eq!(font.descender(), -200);
        assert_eq!(font.text_width("Hello"), 0);
        assert_eq!(font.text_width_points("Hello", 12.0), 0.0);
        assert_eq!(font.glyph_id('A'), None);
    }

    #[test]
    fn test_encode_text_hex_without_face() {
        let font = unparsed_font();
        assert_eq!(font.encode_text_hex(""), "<>");
        assert_eq!(font.encode_text_hex("AB"), "<00000000>");
    }

    #[test]
    fn test_to_pdf_objects() {
        let mut font = unparsed_font();
        font.add_chars("Hello");

        let objects = font.to_pdf_objects();

        assert_eq!(
            objects.type0_font.get(b"Encoding").unwrap().as_name().unwrap(),
            b"Identity-H"
        );
        assert_eq!(
            objects.cid_font.get(b"Subtype").unwrap().as_name().unwrap(),
            b"CIDFontType2"
        );
        assert!(!objects.font_descriptor.is_empty());
        assert_eq!(objects.font_file_stream.content.len(), 100);
        assert!(!objects.tounicode_stream.content.is_empty());
    }

    #[test]
    fn test_generate_tounicode_cmap() {
        let mut font = unparsed_font();
        font.add_chars("AB");

        let cmap = font.generate_tounicode_cmap();

        assert!(cmap.contains("begincmap"));
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0000> <0041>"));
        assert!(cmap.contains("<0000> <0042>"));
        assert!(cmap.contains("endcmap"));
    }

    #[test]
    fn test_generate_tounicode_cmap_empty() {
        let font = unparsed_font();
        let cmap = font.generate_tounicode_cmap();

        assert!(cmap.contains("begincmap"));
        assert!(!cmap.contains("beginbfchar"));
    }

    #[test]
    fn test_font_enum_dispatch() {
        let mut font = Font::Standard(StandardFont::Helvetica);
        font.record_usage("ignored");
        assert_eq!(font.encode_text_hex("/"), "<2F>");
        assert!((font.text_width_points("/", 10.0) - 2.78).abs() < 1e-4);
    }
}
