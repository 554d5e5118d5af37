//! PDF Cross-Reference Parser
//!
//! Parses xref tables and xref streams according to ISO 32000-1 Section
//! 7.5.4 and 7.5.8, follows `/Prev` and `/XRefStm` links through
//! incremental updates, and rebuilds the index by scanning the file when the
//! chain is unusable.

use super::filters;
use super::lexer::{is_regular, is_whitespace, Lexer, Token};
use super::object_stream::ObjectStream;
use super::objects::{find, rfind, ObjectParser};
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{PdfDictionary, PdfObject};
use std::collections::{BTreeMap, HashSet};

/// How far from the end of the file `startxref` is looked for first.
const STARTXREF_WINDOW: usize = 2048;

/// Cross-reference entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    Free { next: u32, generation: u16 },
    /// Uncompressed object at a byte offset
    InUse { offset: usize, generation: u16 },
    /// Object `index` of object stream `stream`
    Compressed { stream: u32, index: usize },
}

impl XRefEntry {
    pub fn is_in_use(&self) -> bool {
        !matches!(self, XRefEntry::Free { .. })
    }

    /// Generation of the object; compressed objects always have 0.
    pub fn generation(&self) -> u16 {
        match self {
            XRefEntry::Free { generation, .. } | XRefEntry::InUse { generation, .. } => *generation,
            XRefEntry::Compressed { .. } => 0,
        }
    }
}

/// One xref table or xref stream with its trailer dictionary.
#[derive(Debug)]
struct XRefSection {
    entries: Vec<(u32, XRefEntry)>,
    trailer: PdfDictionary,
}

/// Merged cross-reference index of a document
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: PdfDictionary,
    recovered: bool,
}

impl XRefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index of `data`, following the `startxref` chain and
    /// falling back to a full scan in lenient mode.
    pub fn load(data: &[u8], options: &ParseOptions) -> ParseResult<Self> {
        let chained = find_startxref(data).and_then(|offset| Self::load_chain(data, offset, options));
        match chained {
            Ok(table) if table.trailer.contains_key("Root") => Ok(table),
            Ok(_) if options.lenient => {
                tracing::warn!("trailer has no /Root; rebuilding cross-reference index");
                Self::recover(data, options)
            }
            Ok(_) => Err(ParseError::MissingKey("Root".to_string())),
            Err(e) if options.lenient => {
                tracing::warn!("cross-reference data unusable ({}); rebuilding index", e);
                Self::recover(data, options)
            }
            Err(e) => Err(e),
        }
    }

    /// Follow the section chain starting at `offset`. Newer sections are
    /// read first and their entries are never overwritten by older ones.
    pub fn load_chain(data: &[u8], offset: usize, options: &ParseOptions) -> ParseResult<Self> {
        let mut table = Self::new();
        let mut pending = vec![offset];
        let mut visited = HashSet::new();

        while let Some(offset) = pending.pop() {
            if !visited.insert(offset) {
                tracing::warn!("cross-reference chain revisits offset {}; stopping", offset);
                continue;
            }
            let section = parse_section(data, offset, options)?;
            tracing::debug!(
                "xref section at {} with {} entries",
                offset,
                section.entries.len()
            );

            let prev = link(&section.trailer, "Prev");
            let xref_stm = link(&section.trailer, "XRefStm");
            table.merge(section);

            // The hybrid /XRefStm is consulted before /Prev.
            if let Some(prev) = prev {
                pending.push(prev);
            }
            if let Some(stm) = xref_stm {
                pending.push(stm);
            }
        }

        Ok(table)
    }

    fn merge(&mut self, section: XRefSection) {
        for (number, entry) in section.entries {
            self.entries.entry(number).or_insert(entry);
        }
        for (key, value) in section.trailer.iter() {
            if !self.trailer.contains_key(key.as_str()) {
                self.trailer.set(key.clone(), value.clone());
            }
        }
    }

    /// Rebuild the index by scanning for `N G obj` headers.
    pub fn recover(data: &[u8], options: &ParseOptions) -> ParseResult<Self> {
        let scanned = scan_objects(data);
        let mut table = Self {
            recovered: true,
            ..Self::default()
        };
        for (&number, &(offset, generation)) in &scanned {
            table
                .entries
                .insert(number, XRefEntry::InUse { offset, generation });
        }

        // Objects packed in object streams the scan found.
        for (&number, &(offset, _)) in &scanned {
            if !header_mentions(data, offset, b"/ObjStm") {
                continue;
            }
            if let Some(objstm) = read_object_stream(data, offset, options) {
                for (index, packed) in objstm.object_numbers().enumerate() {
                    table
                        .entries
                        .entry(packed)
                        .or_insert(XRefEntry::Compressed { stream: number, index });
                }
            }
        }

        // Trailers, newest first.
        let mut end = data.len();
        while let Some(position) = rfind(&data[..end], b"trailer") {
            end = position;
            let mut parser = ObjectParser::new(data, position + b"trailer".len(), options);
            if let Ok(PdfObject::Dictionary(dict)) = parser.parse_object() {
                table.absorb_trailer(&dict);
            }
        }

        // Cross-reference stream dictionaries double as trailers.
        if !table.trailer.contains_key("Root") {
            let mut by_offset: Vec<usize> = scanned.values().map(|(o, _)| *o).collect();
            by_offset.sort_unstable_by(|a, b| b.cmp(a));
            for offset in by_offset {
                if !header_mentions(data, offset, b"/XRef") {
                    continue;
                }
                if let Ok(parsed) = ObjectParser::new(data, offset, options).parse_indirect_object() {
                    if let PdfObject::Stream(stream) = parsed.object {
                        if stream.dict.get_type() == Some("XRef") {
                            table.absorb_trailer(&stream.dict);
                        }
                    }
                }
            }
        }

        // Last resort: any catalog object.
        if !table.trailer.contains_key("Root") {
            for (&number, &(offset, generation)) in scanned.iter().rev() {
                if !header_mentions(data, offset, b"/Catalog") {
                    continue;
                }
                if let Ok(parsed) = ObjectParser::new(data, offset, options).parse_indirect_object() {
                    if parsed.object.as_dict().and_then(|d| d.get_type()) == Some("Catalog") {
                        tracing::warn!("using catalog {} {} R found by scanning", number, generation);
                        table.trailer.set("Root", parsed.id);
                        break;
                    }
                }
            }
        }

        if !table.trailer.contains_key("Root") {
            return Err(ParseError::InvalidTrailer(
                "no trailer with /Root found while scanning the file".to_string(),
            ));
        }
        tracing::debug!("recovered {} cross-reference entries", table.entries.len());
        Ok(table)
    }

    fn absorb_trailer(&mut self, dict: &PdfDictionary) {
        for key in ["Root", "Info", "ID", "Encrypt", "Size"] {
            if let Some(value) = dict.get(key) {
                if !self.trailer.contains_key(key) {
                    self.trailer.set(key, value.clone());
                }
            }
        }
    }

    pub fn get(&self, number: u32) -> Option<&XRefEntry> {
        self.entries.get(&number)
    }

    pub fn insert(&mut self, number: u32, entry: XRefEntry) {
        self.entries.insert(number, entry);
    }

    /// Entries in object-number order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &XRefEntry)> {
        self.entries.iter().map(|(n, e)| (*n, e))
    }

    pub fn trailer(&self) -> &PdfDictionary {
        &self.trailer
    }

    pub fn max_object_number(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    /// Whether the index came from scanning rather than the xref chain.
    pub fn is_recovered(&self) -> bool {
        self.recovered
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn link(trailer: &PdfDictionary, key: &str) -> Option<usize> {
    trailer
        .get_integer(key)
        .and_then(|offset| usize::try_from(offset).ok())
}

/// Offset recorded after the last `startxref` keyword.
pub fn find_startxref(data: &[u8]) -> ParseResult<usize> {
    let window = data.len().saturating_sub(STARTXREF_WINDOW);
    let keyword = rfind(&data[window..], b"startxref")
        .map(|p| p + window)
        .or_else(|| rfind(data, b"startxref"))
        .ok_or_else(|| ParseError::InvalidXRef("startxref not found".to_string()))?;

    let mut lexer = Lexer::at(data, keyword + b"startxref".len());
    match lexer.next_token()? {
        Token::Integer(offset) if offset >= 0 && (offset as u64) < data.len() as u64 => {
            Ok(offset as usize)
        }
        other => Err(ParseError::InvalidXRef(format!(
            "startxref points to {}",
            other.describe()
        ))),
    }
}

fn parse_section(data: &[u8], offset: usize, options: &ParseOptions) -> ParseResult<XRefSection> {
    let mut lexer = Lexer::at(data, offset);
    match lexer.peek_token()? {
        Token::Keyword(ref k) if k == "xref" => parse_table(data, offset, options),
        Token::Integer(_) => parse_stream(data, offset, options),
        other => Err(ParseError::InvalidXRef(format!(
            "expected xref at offset {offset}, found {}",
            other.describe()
        ))),
    }
}

/// Classic `xref` table followed by `trailer <<...>>`.
fn parse_table(data: &[u8], offset: usize, options: &ParseOptions) -> ParseResult<XRefSection> {
    let mut lexer = Lexer::at(data, offset);
    lexer.expect_keyword("xref")?;
    let mut entries = Vec::new();

    loop {
        let start = match lexer.next_token()? {
            Token::Keyword(ref k) if k == "trailer" => break,
            Token::Integer(start) => start,
            other => {
                return Err(ParseError::InvalidXRef(format!(
                    "expected subsection header, found {}",
                    other.describe()
                )))
            }
        };
        let count = match lexer.next_token()? {
            Token::Integer(count) => count,
            other => {
                return Err(ParseError::InvalidXRef(format!(
                    "expected subsection count, found {}",
                    other.describe()
                )))
            }
        };
        let start = u32::try_from(start)
            .map_err(|_| ParseError::InvalidXRef(format!("invalid subsection start {start}")))?;

        for i in 0..count.max(0) {
            let number = start.saturating_add(i as u32);
            entries.push((number, parse_table_entry(&mut lexer)?));
        }
    }

    let mut parser = ObjectParser::new(data, lexer.position(), options);
    let trailer = match parser.parse_object()? {
        PdfObject::Dictionary(dict) => dict,
        other => {
            return Err(ParseError::InvalidTrailer(format!(
                "trailer is a {}",
                other.type_name()
            )))
        }
    };

    Ok(XRefSection { entries, trailer })
}

fn parse_table_entry(lexer: &mut Lexer<'_>) -> ParseResult<XRefEntry> {
    let (first, generation) = match (lexer.next_token()?, lexer.next_token()?) {
        (Token::Integer(first), Token::Integer(generation)) => (first, generation),
        (a, b) => {
            return Err(ParseError::InvalidXRef(format!(
                "malformed entry: {} {}",
                a.describe(),
                b.describe()
            )))
        }
    };
    let generation = u16::try_from(generation).unwrap_or(u16::MAX);
    match lexer.next_token()? {
        Token::Keyword(ref k) if k == "n" => Ok(XRefEntry::InUse {
            offset: usize::try_from(first).unwrap_or(0),
            generation,
        }),
        Token::Keyword(ref k) if k == "f" => Ok(XRefEntry::Free {
            next: u32::try_from(first).unwrap_or(0),
            generation,
        }),
        other => Err(ParseError::InvalidXRef(format!(
            "entry type must be 'n' or 'f', found {}",
            other.describe()
        ))),
    }
}

/// Cross-reference stream (`/Type /XRef`).
fn parse_stream(data: &[u8], offset: usize, options: &ParseOptions) -> ParseResult<XRefSection> {
    let parsed = ObjectParser::new(data, offset, options).parse_indirect_object()?;
    let stream = match parsed.object {
        PdfObject::Stream(stream) => stream,
        other => {
            return Err(ParseError::InvalidXRef(format!(
                "object {} at offset {offset} is a {}, not an xref stream",
                parsed.id,
                other.type_name()
            )))
        }
    };
    if stream.dict.get_type() != Some("XRef") {
        return Err(ParseError::InvalidXRef(format!(
            "object {} is not /Type /XRef",
            parsed.id
        )));
    }

    let widths: Vec<usize> = stream
        .dict
        .get("W")
        .ok_or_else(|| ParseError::MissingKey("W".to_string()))?
        .expect_array("xref stream /W")?
        .iter()
        .map(|w| w.as_integer().and_then(|w| usize::try_from(w).ok()))
        .collect::<Option<_>>()
        .filter(|w: &Vec<usize>| w.len() == 3 && w.iter().all(|&w| w <= 8))
        .ok_or_else(|| ParseError::InvalidXRef("xref stream /W must be three widths".to_string()))?;

    let size = stream.dict.get_integer("Size").unwrap_or(0);
    let index: Vec<i64> = match stream.dict.get("Index") {
        Some(PdfObject::Array(array)) => array.iter().filter_map(|o| o.as_integer()).collect(),
        _ => vec![0, size],
    };

    let decoded = filters::decode_stream(&stream.data, &stream.dict)?;
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(ParseError::InvalidXRef("xref stream rows are empty".to_string()));
    }
    let mut rows = decoded.chunks_exact(row_len);
    let mut entries = Vec::new();

    'subsections: for pair in index.chunks(2) {
        let (start, count) = match *pair {
            [start, count] => (start, count),
            _ => break,
        };
        for i in 0..count.max(0) {
            let Some(row) = rows.next() else {
                tracing::warn!("xref stream {} ends before its /Index does", parsed.id);
                break 'subsections;
            };
            let Some(number) = start.checked_add(i).and_then(|n| u32::try_from(n).ok()) else {
                continue;
            };
            let (type_field, rest) = row.split_at(widths[0]);
            let (field2, field3) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 { 1 } else { read_field(type_field) };
            let field2 = read_field(field2);
            let field3 = read_field(field3);

            let entry = match kind {
                0 => XRefEntry::Free {
                    next: field2 as u32,
                    generation: field3 as u16,
                },
                1 => XRefEntry::InUse {
                    offset: field2 as usize,
                    generation: field3 as u16,
                },
                2 => XRefEntry::Compressed {
                    stream: field2 as u32,
                    index: field3 as usize,
                },
                // Unknown types are references to the null object.
                _ => continue,
            };
            entries.push((number, entry));
        }
    }

    Ok(XRefSection {
        entries,
        trailer: stream.dict,
    })
}

/// Big-endian unsigned integer of up to eight bytes
fn read_field(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Locate every `N G obj` header in `data`. A later definition of the same
/// object number replaces an earlier one.
pub fn scan_objects(data: &[u8]) -> BTreeMap<u32, (usize, u16)> {
    let mut found = BTreeMap::new();
    let mut from = 0;
    while let Some(relative) = find(&data[from..], b"obj") {
        let position = from + relative;
        from = position + 3;
        if data.get(position + 3).is_some_and(|&b| is_regular(b)) {
            continue;
        }
        if let Some((start, number, generation)) = header_before(data, position) {
            found.insert(number, (start, generation));
        }
    }
    found
}

fn header_before(data: &[u8], obj_keyword: usize) -> Option<(usize, u32, u16)> {
    let skip_space = |mut i: usize| {
        while i > 0 && is_whitespace(data[i - 1]) {
            i -= 1;
        }
        i
    };
    let skip_digits = |mut i: usize| {
        while i > 0 && data[i - 1].is_ascii_digit() {
            i -= 1;
        }
        i
    };

    let generation_end = skip_space(obj_keyword);
    let generation_start = skip_digits(generation_end);
    if generation_start == generation_end {
        return None;
    }
    let number_end = skip_space(generation_start);
    if number_end == generation_start {
        return None;
    }
    let number_start = skip_digits(number_end);
    if number_start == number_end || (number_start > 0 && is_regular(data[number_start - 1])) {
        return None;
    }

    let number = std::str::from_utf8(&data[number_start..number_end]).ok()?.parse().ok()?;
    let generation = std::str::from_utf8(&data[generation_start..generation_end])
        .ok()?
        .parse()
        .ok()?;
    Some((number_start, number, generation))
}

/// Whether the first part of the object at `offset` contains `marker`.
fn header_mentions(data: &[u8], offset: usize, marker: &[u8]) -> bool {
    let end = data.len().min(offset.saturating_add(1024));
    data.get(offset..end)
        .map(|head| {
            let head = match find(head, b"stream") {
                Some(stream_keyword) => &head[..stream_keyword],
                None => head,
            };
            find(head, marker).is_some()
        })
        .unwrap_or(false)
}

fn read_object_stream(data: &[u8], offset: usize, options: &ParseOptions) -> Option<ObjectStream> {
    let parsed = ObjectParser::new(data, offset, options)
        .parse_indirect_object()
        .ok()?;
    let stream = parsed.object.as_stream()?;
    if stream.dict.get_type() != Some("ObjStm") {
        return None;
    }
    let decoded = stream.decode().ok()?;
    ObjectStream::parse(stream, &decoded, options).ok()
}
