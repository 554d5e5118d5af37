//! Attachment discovery
//!
//! Enumeration order is fixed: the embedded-files name tree in document
//! order first, then pages in page order with each page's `/Annots` in
//! array order. [`list`] reports metadata and never fails because of a
//! single bad stream; [`find`] decodes the one attachment asked for and
//! reports decode failures.

use super::Attachment;
use crate::objects::{ObjectId, PdfDictionary, PdfObject};
use crate::parser::{ParseError, ParseResult, PdfDocument};
use std::collections::HashSet;
use std::rc::Rc;

const UNKNOWN_NAME: &str = "unknown";

/// An attachment before its contents are looked at.
struct Entry {
    name: String,
    description: String,
    page: Option<u32>,
    /// The embedded-file stream, when the file specification has one.
    stream: Option<Rc<PdfObject>>,
}

/// Metadata of every attachment in `document`.
pub fn list(document: &PdfDocument) -> ParseResult<Vec<Attachment>> {
    let attachments = entries(document)?
        .into_iter()
        .map(|entry| {
            let size = entry.stream.as_deref().and_then(|stream| stream_size(document, stream, &entry.name));
            Attachment {
                name: entry.name,
                size,
                description: entry.description,
                page: entry.page,
                data: None,
            }
        })
        .collect();
    Ok(attachments)
}

/// The first attachment called `name`, with its contents.
///
/// An attachment whose file specification has no embedded stream has no
/// contents to return and counts as absent. A stream that cannot be decoded
/// is a [`ParseError::CorruptStream`].
pub fn find(document: &PdfDocument, name: &str) -> ParseResult<Option<Attachment>> {
    let Some(entry) = entries(document)?.into_iter().find(|entry| entry.name == name) else {
        return Ok(None);
    };
    let Some(object) = entry.stream else {
        tracing::debug!("attachment '{}' has no embedded stream", name);
        return Ok(None);
    };

    let stream = object.expect_stream("embedded file")?;
    let data = document.decode_stream(stream)?;
    let size = declared_size(document, stream.dict.get("Params")).unwrap_or(data.len() as u64);
    if size != data.len() as u64 {
        tracing::warn!(
            "attachment '{}' declares {} bytes but decodes to {}",
            name,
            size,
            data.len()
        );
    }

    Ok(Some(Attachment {
        name: entry.name,
        size: Some(size),
        description: entry.description,
        page: entry.page,
        data: Some(data),
    }))
}

fn entries(document: &PdfDocument) -> ParseResult<Vec<Entry>> {
    let mut entries = document_entries(document)?;
    entries.extend(page_entries(document)?);
    tracing::debug!("found {} attachments", entries.len());
    Ok(entries)
}

/// The catalog's `/Names /EmbeddedFiles` node, if there is one.
pub(crate) fn embedded_files_root(document: &PdfDocument) -> ParseResult<Option<Rc<PdfObject>>> {
    let catalog = document.catalog()?;
    let catalog = catalog.expect_dict("catalog")?;
    let Some(names) = document.resolve_optional(catalog.get("Names"))? else {
        return Ok(None);
    };
    let Some(names) = names.as_dict() else {
        tracing::warn!("catalog /Names is a {}, not a dictionary", names.type_name());
        return Ok(None);
    };
    document.resolve_optional(names.get("EmbeddedFiles"))
}

/// Flatten the embedded-files name tree into `(name, value)` pairs in key
/// order. Intermediate `/Kids` nodes are walked depth-first.
pub(crate) fn name_tree_pairs(
    document: &PdfDocument,
    root: &PdfObject,
) -> ParseResult<Vec<(String, PdfObject)>> {
    let mut pairs = Vec::new();
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if let Some(id) = node.as_reference() {
            if !visited.insert(id) {
                tracing::warn!("name tree node {} visited twice; skipping", id);
                continue;
            }
        }
        let node = document.resolve(&node)?;
        let Some(node) = node.as_dict() else {
            tracing::warn!("name tree node is a {}; skipping", node.type_name());
            continue;
        };

        if let Some(names) = document.resolve_optional(node.get("Names"))? {
            let names = names.expect_array("name tree /Names")?;
            if names.len() % 2 != 0 {
                return Err(ParseError::MalformedNameTree(format!(
                    "/Names has an odd number of elements ({})",
                    names.len()
                )));
            }
            let elements: Vec<&PdfObject> = names.iter().collect();
            for pair in elements.chunks(2) {
                match text(document, Some(pair[0])) {
                    Some(key) => pairs.push((key, pair[1].clone())),
                    None => tracing::warn!(
                        "name tree key is a {}, not a string; skipping",
                        pair[0].type_name()
                    ),
                }
            }
        }

        if let Some(kids) = document.resolve_optional(node.get("Kids"))? {
            let kids = kids.expect_array("name tree /Kids")?;
            stack.extend(kids.iter().rev().cloned());
        }
    }

    Ok(pairs)
}

fn document_entries(document: &PdfDocument) -> ParseResult<Vec<Entry>> {
    let Some(root) = embedded_files_root(document)? else {
        return Ok(Vec::new());
    };

    let mut entries = Vec::new();
    for (name, value) in name_tree_pairs(document, &root)? {
        match file_spec(document, &value) {
            Ok(spec) => entries.push(Entry {
                name,
                description: spec.description.unwrap_or_default(),
                page: None,
                stream: spec.stream,
            }),
            Err(e) => tracing::warn!("skipping attachment '{}': {}", name, e),
        }
    }
    Ok(entries)
}

fn page_entries(document: &PdfDocument) -> ParseResult<Vec<Entry>> {
    let mut entries = Vec::new();
    for page in document.pages()? {
        let annots = match document.resolve_optional(page.dict.get("Annots")) {
            Ok(Some(annots)) => annots,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("page {}: unreadable /Annots: {}", page.number, e);
                continue;
            }
        };
        let Some(annots) = annots.as_array() else {
            tracing::warn!("page {}: /Annots is not an array", page.number);
            continue;
        };

        for annot in annots.iter() {
            match annotation_entry(document, annot, page.number) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    "page {}: skipping file attachment annotation: {}",
                    page.number,
                    e
                ),
            }
        }
    }
    Ok(entries)
}

fn annotation_entry(
    document: &PdfDocument,
    annot: &PdfObject,
    page: u32,
) -> ParseResult<Option<Entry>> {
    let annot = document.resolve(annot)?;
    let Some(annot) = annot.as_dict() else {
        return Ok(None);
    };
    if annot.get_name("Subtype") != Some("FileAttachment") {
        return Ok(None);
    }

    let spec = match annot.get("FS") {
        Some(fs) => file_spec(document, fs)?,
        None => FileSpec::default(),
    };
    let description = spec
        .description
        .or_else(|| text(document, annot.get("Contents")))
        .unwrap_or_default();

    Ok(Some(Entry {
        name: spec.file_name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        description,
        page: Some(page),
        stream: spec.stream,
    }))
}

#[derive(Default)]
struct FileSpec {
    /// `/F`, else `/UF`.
    file_name: Option<String>,
    description: Option<String>,
    stream: Option<Rc<PdfObject>>,
}

fn file_spec(document: &PdfDocument, value: &PdfObject) -> ParseResult<FileSpec> {
    let value = document.resolve(value)?;
    let dict = match &*value {
        // A bare file name: nothing is embedded.
        PdfObject::String(name) => {
            return Ok(FileSpec {
                file_name: Some(name.to_text()),
                ..FileSpec::default()
            })
        }
        other => other.expect_dict("file specification")?,
    };

    Ok(FileSpec {
        file_name: text(document, dict.get("F")).or_else(|| text(document, dict.get("UF"))),
        description: text(document, dict.get("Desc")),
        stream: embedded_stream(document, dict)?,
    })
}

/// `/EF /F`, else `/EF /UF`, resolved to a stream.
fn embedded_stream(
    document: &PdfDocument,
    spec: &PdfDictionary,
) -> ParseResult<Option<Rc<PdfObject>>> {
    let Some(ef) = document.resolve_optional(spec.get("EF"))? else {
        return Ok(None);
    };
    let ef = ef.expect_dict("file specification /EF")?;
    let Some(stream) = document.resolve_optional(ef.get("F").or_else(|| ef.get("UF")))? else {
        return Ok(None);
    };
    stream.expect_stream("embedded file")?;
    Ok(Some(stream))
}

/// `/Params /Size`, else the decoded length. Decode failures are logged
/// and leave the size unknown.
fn stream_size(document: &PdfDocument, object: &PdfObject, name: &str) -> Option<u64> {
    let stream = object.as_stream()?;
    if let Some(size) = declared_size(document, stream.dict.get("Params")) {
        return Some(size);
    }
    match document.decode_stream(stream) {
        Ok(data) => Some(data.len() as u64),
        Err(e) => {
            tracing::warn!("attachment '{}': size unknown: {}", name, e);
            None
        }
    }
}

fn declared_size(document: &PdfDocument, params: Option<&PdfObject>) -> Option<u64> {
    let params = document.resolve_optional(params).ok()??;
    let size = document.resolve_optional(params.as_dict()?.get("Size")).ok()??;
    size.as_integer().and_then(|size| u64::try_from(size).ok())
}

/// A text string entry, resolved. Names are accepted as well.
fn text(document: &PdfDocument, object: Option<&PdfObject>) -> Option<String> {
    let object = document.resolve_optional(object).ok()??;
    match &*object {
        PdfObject::String(s) => Some(s.to_text()),
        PdfObject::Name(name) => Some(name.as_str().to_string()),
        _ => None,
    }
}
