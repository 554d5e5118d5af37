use std::borrow::Borrow;
use std::fmt;

/// PDF name object (without the leading slash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PdfName(pub String);

impl PdfName {
    pub fn new(name: impl Into<String>) -> Self {
        PdfName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PdfName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PdfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl From<&str> for PdfName {
    fn from(s: &str) -> Self {
        PdfName(s.to_string())
    }
}

impl From<String> for PdfName {
    fn from(s: String) -> Self {
        PdfName(s)
    }
}

/// PDF string object. Holds raw bytes; text interpretation is explicit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PdfString(pub Vec<u8>);

const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

// PDFDocEncoding differs from Latin-1 in 0x80..=0xA0.
const PDF_DOC_HIGH: [char; 33] = [
    '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}',
    '\u{2044}', '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}',
    '\u{201D}', '\u{2018}', '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}',
    '\u{0141}', '\u{0152}', '\u{0160}', '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}',
    '\u{0153}', '\u{0161}', '\u{017E}', '\u{FFFD}', '\u{20AC}',
];

impl PdfString {
    pub fn new(data: Vec<u8>) -> Self {
        PdfString(data)
    }

    /// Encode text the way PDF text strings expect it: plain bytes for
    /// ASCII, UTF-16BE with a byte-order mark otherwise.
    pub fn from_text(text: &str) -> Self {
        if text.is_ascii() {
            return PdfString(text.as_bytes().to_vec());
        }
        let mut bytes = Vec::with_capacity(2 + text.len() * 2);
        bytes.extend_from_slice(&UTF16BE_BOM);
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        PdfString(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode as a PDF text string.
    pub fn to_text(&self) -> String {
        let bytes = self.0.as_slice();
        if let Some(rest) = bytes.strip_prefix(&UTF16BE_BOM) {
            let units: Vec<u16> = rest
                .chunks(2)
                .map(|pair| {
                    let high = pair[0] as u16;
                    let low = pair.get(1).copied().unwrap_or(0) as u16;
                    (high << 8) | low
                })
                .collect();
            return String::from_utf16_lossy(&units);
        }
        if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
            return String::from_utf8_lossy(rest).into_owned();
        }
        if let Ok(text) = std::str::from_utf8(bytes) {
            return text.to_string();
        }
        bytes.iter().map(|&b| pdf_doc_char(b)).collect()
    }
}

fn pdf_doc_char(byte: u8) -> char {
    match byte {
        0x80..=0xA0 => PDF_DOC_HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

impl From<&str> for PdfString {
    fn from(s: &str) -> Self {
        PdfString::from_text(s)
    }
}
