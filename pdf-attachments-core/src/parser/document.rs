//! PDF Document - the object store of a parsed file
//!
//! A [`PdfDocument`] owns the complete file buffer and the merged
//! cross-reference index. Objects are parsed the first time they are
//! requested and cached behind `RefCell`s, so every accessor takes `&self`
//! and documents can be shared freely within one thread.
//!
//! Objects never hold pointers to each other: a [`PdfObject::Reference`] is
//! followed by asking the document for the referenced [`ObjectId`].
//!
//! # Example
//!
//! ```rust,no_run
//! use pdf_attachments::parser::PdfDocument;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let document = PdfDocument::open("report.pdf")?;
//! println!("PDF {}", document.version());
//!
//! let catalog = document.catalog()?;
//! let catalog = catalog.expect_dict("catalog")?;
//! if let Some(pages) = catalog.get("Pages") {
//!     let pages = document.resolve(pages)?;
//!     println!("page tree: {:?}", pages.as_dict().and_then(|d| d.get_integer("Count")));
//! }
//! # Ok(())
//! # }
//! ```

use super::filters;
use super::object_stream::ObjectStream;
use super::objects::{find, IndirectObject, ObjectParser};
use super::page_tree::{self, ParsedPage};
use super::trailer::PdfTrailer;
use super::xref::{scan_objects, XRefEntry, XRefTable};
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{ObjectId, PdfArray, PdfObject, PdfStream};
use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// The header must start within this many bytes.
const HEADER_WINDOW: usize = 1024;

/// Version assumed when a lenient parse finds no header.
const FALLBACK_VERSION: &str = "1.4";

/// Parsed PDF file with lazily materialised objects.
pub struct PdfDocument {
    data: Vec<u8>,
    /// File the document was read from, if any.
    path: Option<PathBuf>,
    version: String,
    xref: XRefTable,
    trailer: PdfTrailer,
    options: ParseOptions,
    /// Objects by object number. Only one generation of a number is live.
    objects: RefCell<HashMap<u32, Rc<PdfObject>>>,
    /// Byte spans of objects parsed from the file body.
    spans: RefCell<HashMap<u32, Range<usize>>>,
    object_streams: RefCell<HashMap<u32, Rc<ObjectStream>>>,
    /// Object numbers currently being loaded, for cycle detection.
    loading: RefCell<HashSet<u32>>,
    /// Offsets found by scanning, used when an xref offset is wrong.
    scanned: OnceCell<BTreeMap<u32, (usize, u16)>>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("len", &self.data.len())
            .field("objects", &self.xref.len())
            .finish()
    }
}

impl PdfDocument {
    /// Read and parse the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> ParseResult<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> ParseResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let mut document = Self::parse_with_options(data, options)?;
        document.path = Some(path.to_path_buf());
        Ok(document)
    }

    /// Parse an in-memory file with the default (lenient) options.
    pub fn parse(data: Vec<u8>) -> ParseResult<Self> {
        Self::parse_with_options(data, ParseOptions::default())
    }

    pub fn parse_with_options(data: Vec<u8>, options: ParseOptions) -> ParseResult<Self> {
        let version = match parse_header(&data) {
            Some(version) => version,
            None if options.lenient => {
                tracing::warn!("no %PDF header found; assuming PDF {}", FALLBACK_VERSION);
                FALLBACK_VERSION.to_string()
            }
            None => return Err(ParseError::InvalidHeader),
        };

        let xref = XRefTable::load(&data, &options)?;
        let trailer = PdfTrailer::from_dict(xref.trailer().clone());
        trailer.validate()?;
        tracing::debug!(
            "parsed PDF {} with {} cross-reference entries{}",
            version,
            xref.len(),
            if xref.is_recovered() { " (recovered)" } else { "" }
        );

        Ok(Self {
            data,
            path: None,
            version,
            xref,
            trailer,
            options,
            objects: RefCell::new(HashMap::new()),
            spans: RefCell::new(HashMap::new()),
            object_streams: RefCell::new(HashMap::new()),
            loading: RefCell::new(HashSet::new()),
            scanned: OnceCell::new(),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Header version, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn trailer(&self) -> &PdfTrailer {
        &self.trailer
    }

    pub fn xref(&self) -> &XRefTable {
        &self.xref
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// The complete file buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn max_object_number(&self) -> u32 {
        self.xref.max_object_number()
    }

    /// Every object the cross-reference index marks as in use, in
    /// object-number order.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.xref
            .iter()
            .filter(|(number, entry)| *number != 0 && entry.is_in_use())
            .map(|(number, entry)| ObjectId::new(number, entry.generation()))
            .collect()
    }

    /// Whether object `number` lives inside an object stream.
    pub fn is_compressed(&self, number: u32) -> bool {
        matches!(self.xref.get(number), Some(XRefEntry::Compressed { .. }))
    }

    /// Get an indirect object. A reference to a missing or free object
    /// yields null, as the PDF format prescribes.
    pub fn get_object(&self, id: ObjectId) -> ParseResult<Rc<PdfObject>> {
        if let Some(object) = self.objects.borrow().get(&id.number()) {
            return Ok(Rc::clone(object));
        }

        let entry = match self.xref.get(id.number()) {
            Some(entry) if entry.is_in_use() => *entry,
            _ => {
                tracing::debug!("{} is not in use; treating it as null", id);
                return Ok(Rc::new(PdfObject::Null));
            }
        };
        if entry.generation() != id.generation() {
            tracing::warn!(
                "{} requested but the current generation is {}",
                id,
                entry.generation()
            );
        }

        if !self.loading.borrow_mut().insert(id.number()) {
            return Err(ParseError::CircularReference(id.number(), id.generation()));
        }
        let loaded = self.load(id, entry);
        self.loading.borrow_mut().remove(&id.number());

        let object = Rc::new(loaded?);
        self.objects
            .borrow_mut()
            .insert(id.number(), Rc::clone(&object));
        Ok(object)
    }

    fn load(&self, id: ObjectId, entry: XRefEntry) -> ParseResult<PdfObject> {
        match entry {
            XRefEntry::InUse { offset, .. } => {
                let parsed = match self.parse_at(offset, id) {
                    Ok(parsed) => parsed,
                    Err(e @ ParseError::CircularReference(..)) => return Err(e),
                    Err(e) => self.reparse_from_scan(id, offset).ok_or(e)?,
                };
                self.spans.borrow_mut().insert(id.number(), parsed.span);
                Ok(parsed.object)
            }
            XRefEntry::Compressed { stream, index } => {
                let objstm = self.object_stream(stream)?;
                match objstm.get(id.number(), index) {
                    Some(object) => Ok(object.clone()),
                    None if self.options.lenient => {
                        tracing::warn!("{} is missing from object stream {}", id, stream);
                        Ok(PdfObject::Null)
                    }
                    None => Err(ParseError::InvalidReference(id.number(), id.generation())),
                }
            }
            XRefEntry::Free { .. } => Ok(PdfObject::Null),
        }
    }

    fn parse_at(&self, offset: usize, id: ObjectId) -> ParseResult<IndirectObject> {
        let resolve_length = |length: ObjectId| self.resolve_length(length);
        let parsed = ObjectParser::new(&self.data, offset, &self.options)
            .with_length_resolver(&resolve_length)
            .parse_indirect_object()?;
        if parsed.id.number() != id.number() {
            return Err(ParseError::syntax(
                offset,
                format!("expected object {id}, found {}", parsed.id),
            ));
        }
        Ok(parsed)
    }

    /// Retry an object whose xref offset is wrong at the offset found by
    /// scanning the file.
    fn reparse_from_scan(&self, id: ObjectId, bad_offset: usize) -> Option<IndirectObject> {
        if !self.options.lenient {
            return None;
        }
        let scanned = self.scanned.get_or_init(|| scan_objects(&self.data));
        let (offset, _) = *scanned.get(&id.number())?;
        if offset == bad_offset {
            return None;
        }
        tracing::warn!(
            "{} is not at offset {}; using offset {} found by scanning",
            id,
            bad_offset,
            offset
        );
        self.parse_at(offset, id).ok()
    }

    fn resolve_length(&self, id: ObjectId) -> ParseResult<Option<i64>> {
        match self.resolve_reference(id) {
            Ok(object) => Ok(object.as_integer()),
            Err(e @ ParseError::CircularReference(..)) => Err(e),
            Err(e) => {
                tracing::warn!("stream length {} unreadable: {}", id, e);
                Ok(None)
            }
        }
    }

    fn object_stream(&self, number: u32) -> ParseResult<Rc<ObjectStream>> {
        if let Some(objstm) = self.object_streams.borrow().get(&number) {
            return Ok(Rc::clone(objstm));
        }

        let generation = self.xref.get(number).map_or(0, |e| e.generation());
        let container = self.get_object(ObjectId::new(number, generation))?;
        let stream = container.expect_stream("object stream")?;
        let decoded = self.decode_stream(stream)?;
        let objstm = Rc::new(ObjectStream::parse(stream, &decoded, &self.options)?);
        tracing::debug!("object stream {} holds {} objects", number, objstm.len());

        self.object_streams
            .borrow_mut()
            .insert(number, Rc::clone(&objstm));
        Ok(objstm)
    }

    /// Follow a chain of references to a non-reference object.
    pub fn resolve_reference(&self, id: ObjectId) -> ParseResult<Rc<PdfObject>> {
        let mut current = id;
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(current) {
                return Err(ParseError::CircularReference(
                    current.number(),
                    current.generation(),
                ));
            }
            let object = self.get_object(current)?;
            match &*object {
                PdfObject::Reference(next) => current = *next,
                _ => return Ok(object),
            }
        }
    }

    /// Resolve `object` if it is a reference; direct objects are returned
    /// as they are.
    pub fn resolve(&self, object: &PdfObject) -> ParseResult<Rc<PdfObject>> {
        match object {
            PdfObject::Reference(id) => self.resolve_reference(*id),
            direct => Ok(Rc::new(direct.clone())),
        }
    }

    /// Resolve an optional entry; a missing entry and null both give `None`.
    pub fn resolve_optional(&self, object: Option<&PdfObject>) -> ParseResult<Option<Rc<PdfObject>>> {
        match object {
            None => Ok(None),
            Some(object) => {
                let resolved = self.resolve(object)?;
                Ok((!resolved.is_null()).then_some(resolved))
            }
        }
    }

    /// The document catalog (`/Root`).
    pub fn catalog(&self) -> ParseResult<Rc<PdfObject>> {
        let catalog = self.resolve_reference(self.trailer.root()?)?;
        catalog.expect_dict("catalog")?;
        Ok(catalog)
    }

    /// Decode a stream of this document. Indirect `/Filter` and
    /// `/DecodeParms` values are resolved first.
    pub fn decode_stream(&self, stream: &PdfStream) -> ParseResult<Vec<u8>> {
        const FILTER_KEYS: [&str; 3] = ["Filter", "DecodeParms", "DP"];

        let indirect = FILTER_KEYS
            .iter()
            .filter_map(|key| stream.dict.get(key))
            .any(contains_reference);
        if !indirect {
            return Ok(stream.decode()?);
        }

        let mut dict = stream.dict.clone();
        for key in FILTER_KEYS {
            if let Some(value) = stream.dict.get(key) {
                dict.set(key, self.resolve_one_level(value)?);
            }
        }
        Ok(filters::decode_stream(&stream.data, &dict)?)
    }

    /// Resolve a value and, if it is an array, its elements.
    fn resolve_one_level(&self, value: &PdfObject) -> ParseResult<PdfObject> {
        let resolved = self.resolve(value)?;
        match &*resolved {
            PdfObject::Array(array) => {
                let elements = array
                    .iter()
                    .map(|element| self.resolve(element).map(|r| (*r).clone()))
                    .collect::<ParseResult<Vec<_>>>()?;
                Ok(PdfObject::Array(PdfArray::from(elements)))
            }
            other => Ok(other.clone()),
        }
    }

    /// Byte range of an object's `N G obj ... endobj` definition. `None`
    /// for objects stored in object streams.
    pub fn object_span(&self, id: ObjectId) -> ParseResult<Option<Range<usize>>> {
        if self.is_compressed(id.number()) {
            return Ok(None);
        }
        self.get_object(id)?;
        Ok(self.spans.borrow().get(&id.number()).cloned())
    }

    /// Leaf pages in page order.
    pub fn pages(&self) -> ParseResult<Vec<ParsedPage>> {
        page_tree::collect_pages(self)
    }
}

fn contains_reference(object: &PdfObject) -> bool {
    match object {
        PdfObject::Reference(_) => true,
        PdfObject::Array(array) => array.iter().any(contains_reference),
        PdfObject::Dictionary(dict) => dict.iter().any(|(_, v)| contains_reference(v)),
        _ => false,
    }
}

/// Version from a `%PDF-x.y` header near the start of the file.
fn parse_header(data: &[u8]) -> Option<String> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let start = find(window, b"%PDF-")? + b"%PDF-".len();
    let version: String = data[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .map(|&b| b as char)
        .collect();
    (!version.is_empty()).then_some(version)
}
