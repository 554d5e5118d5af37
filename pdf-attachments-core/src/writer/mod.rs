//! PDF writing functionality
//!
//! [`PdfWriter`] serializes objects and tracks their offsets for the
//! cross-reference table. [`clone_with_attachments`] uses it to produce a
//! complete copy of a parsed document with new embedded files registered.

mod cloner;

pub use cloner::clone_with_attachments;

use crate::objects::{ObjectId, PdfDictionary, PdfObject, PdfString};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Options for writing documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Flate-compress new embedded-file streams. Has no effect without the
    /// `compression` feature.
    pub compress_streams: bool,
    /// Header version to write instead of the source document's.
    pub pdf_version: Option<String>,
    /// Record an MD5 `/CheckSum` in embedded-file parameters.
    pub checksums: bool,
    /// Record a `/ModDate` in embedded-file parameters.
    pub timestamps: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compress_streams: true,
            pdf_version: None,
            checksums: true,
            timestamps: true,
        }
    }
}

impl WriterConfig {
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress_streams = compress;
        self
    }

    pub fn with_pdf_version(mut self, version: impl Into<String>) -> Self {
        self.pdf_version = Some(version.into());
        self
    }

    pub fn with_checksums(mut self, checksums: bool) -> Self {
        self.checksums = checksums;
        self
    }

    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Output without any time-dependent bytes.
    pub fn reproducible() -> Self {
        Self::default().with_timestamps(false)
    }
}

pub struct PdfWriter<W: Write> {
    writer: W,
    /// Offset and generation of every object written, by object number.
    xref_positions: BTreeMap<u32, (u64, u16)>,
    current_position: u64,
}

impl<W: Write> PdfWriter<W> {
    pub fn new_with_writer(writer: W) -> Self {
        Self {
            writer,
            xref_positions: BTreeMap::new(),
            current_position: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.current_position
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_header(&mut self, version: &str) -> io::Result<()> {
        self.write_bytes(format!("%PDF-{version}\n").as_bytes())?;
        // Binary comment to ensure file is treated as binary
        self.write_bytes(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])
    }

    pub fn write_object(&mut self, id: ObjectId, object: &PdfObject) -> io::Result<()> {
        self.xref_positions
            .insert(id.number(), (self.current_position, id.generation()));

        let header = format!("{} {} obj\n", id.number(), id.generation());
        self.write_bytes(header.as_bytes())?;
        self.write_object_value(object)?;
        self.write_bytes(b"\nendobj\n")
    }

    /// Write an already serialized `N G obj ... endobj` definition.
    pub fn write_raw_object(&mut self, id: ObjectId, definition: &[u8]) -> io::Result<()> {
        self.xref_positions
            .insert(id.number(), (self.current_position, id.generation()));
        self.write_bytes(definition)?;
        self.write_bytes(b"\n")
    }

    pub fn write_object_value(&mut self, object: &PdfObject) -> io::Result<()> {
        match object {
            PdfObject::Null => self.write_bytes(b"null"),
            PdfObject::Boolean(b) => self.write_bytes(if *b { b"true" } else { b"false" }),
            PdfObject::Integer(i) => self.write_bytes(i.to_string().as_bytes()),
            PdfObject::Real(f) => self.write_bytes(format_real(*f).as_bytes()),
            PdfObject::String(s) => self.write_string(s),
            PdfObject::Name(n) => self.write_name(n.as_str()),
            PdfObject::Array(array) => {
                self.write_bytes(b"[")?;
                for (i, element) in array.iter().enumerate() {
                    if i > 0 {
                        self.write_bytes(b" ")?;
                    }
                    self.write_object_value(element)?;
                }
                self.write_bytes(b"]")
            }
            PdfObject::Dictionary(dict) => self.write_dictionary(dict, None),
            PdfObject::Stream(stream) => {
                self.write_dictionary(&stream.dict, Some(stream.data.len()))?;
                self.write_bytes(b"\nstream\n")?;
                self.write_bytes(&stream.data)?;
                self.write_bytes(b"\nendstream")
            }
            PdfObject::Reference(id) => self.write_bytes(id.to_string().as_bytes()),
        }
    }

    /// `length`, when given, replaces any `/Length` entry.
    fn write_dictionary(&mut self, dict: &PdfDictionary, length: Option<usize>) -> io::Result<()> {
        self.write_bytes(b"<<")?;
        for (key, value) in dict.iter() {
            if length.is_some() && key.as_str() == "Length" {
                continue;
            }
            self.write_bytes(b" ")?;
            self.write_name(key.as_str())?;
            self.write_bytes(b" ")?;
            self.write_object_value(value)?;
        }
        if let Some(length) = length {
            self.write_bytes(format!(" /Length {length}").as_bytes())?;
        }
        self.write_bytes(b" >>")
    }

    /// Printable text goes out as a literal string, anything else as hex.
    fn write_string(&mut self, s: &PdfString) -> io::Result<()> {
        let bytes = s.as_bytes();
        if bytes.iter().all(|b| (0x20..0x7F).contains(b)) {
            let mut literal = Vec::with_capacity(bytes.len() + 2);
            literal.push(b'(');
            for &b in bytes {
                if matches!(b, b'(' | b')' | b'\\') {
                    literal.push(b'\\');
                }
                literal.push(b);
            }
            literal.push(b')');
            self.write_bytes(&literal)
        } else {
            let mut hex = String::with_capacity(bytes.len() * 2 + 2);
            hex.push('<');
            for b in bytes {
                hex.push_str(&format!("{b:02X}"));
            }
            hex.push('>');
            self.write_bytes(hex.as_bytes())
        }
    }

    fn write_name(&mut self, name: &str) -> io::Result<()> {
        let mut out = String::with_capacity(name.len() + 1);
        out.push('/');
        for &b in name.as_bytes() {
            if b == b'#' || !crate::parser::lexer::is_regular(b) || !(0x21..0x7F).contains(&b) {
                out.push_str(&format!("#{b:02X}"));
            } else {
                out.push(b as char);
            }
        }
        self.write_bytes(out.as_bytes())
    }

    /// Classic cross-reference table covering `0..=max` written object
    /// number. Returns the table's offset for `startxref`.
    ///
    /// `free_generation` supplies the generation of a gap entry.
    pub fn write_xref(&mut self, free_generation: impl Fn(u32) -> u16) -> io::Result<u64> {
        let xref_position = self.current_position;
        let max_obj_num = self.max_object_number();

        self.write_bytes(format!("xref\n0 {}\n", max_obj_num + 1).as_bytes())?;
        self.write_bytes(b"0000000000 65535 f \n")?;

        let mut table = String::with_capacity(max_obj_num as usize * 20);
        for obj_num in 1..=max_obj_num {
            match self.xref_positions.get(&obj_num) {
                Some((position, generation)) => {
                    table.push_str(&format!("{position:010} {generation:05} n \n"))
                }
                None => table.push_str(&format!("0000000000 {:05} f \n", free_generation(obj_num))),
            }
        }
        self.write_bytes(table.as_bytes())?;
        Ok(xref_position)
    }

    pub fn write_trailer(&mut self, trailer: &PdfDictionary, xref_position: u64) -> io::Result<()> {
        self.write_bytes(b"trailer\n")?;
        self.write_dictionary(trailer, None)?;
        self.write_bytes(b"\nstartxref\n")?;
        self.write_bytes(xref_position.to_string().as_bytes())?;
        self.write_bytes(b"\n%%EOF\n")?;
        self.writer.flush()
    }

    pub fn max_object_number(&self) -> u32 {
        self.xref_positions.keys().next_back().copied().unwrap_or(0)
    }

    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.current_position += data.len() as u64;
        Ok(())
    }
}

fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Format a DateTime as a PDF date string (D:YYYYMMDDHHmmSSOHH'mm)
pub(crate) fn format_pdf_date(date: DateTime<Utc>) -> String {
    // For UTC, the offset is always +00'00
    format!("{}+00'00", date.format("D:%Y%m%d%H%M%S"))
}
