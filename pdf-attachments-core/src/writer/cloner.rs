//! Clone a document and register new embedded files.
//!
//! The output is a complete PDF, not an incremental update. Objects of the
//! source are copied byte for byte where possible; the catalog, the
//! `/Names` dictionary and the embedded-files node are rewritten under
//! their existing object numbers when they have one.

use super::{format_pdf_date, PdfWriter, WriterConfig};
use crate::attachments::locator::name_tree_pairs;
use crate::objects::{ObjectId, PdfArray, PdfDictionary, PdfName, PdfObject, PdfStream, PdfString};
use crate::parser::{ParseResult, PdfDocument, XRefEntry};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Lowest header version written; embedded files need PDF 1.4 features.
const MIN_OUTPUT_VERSION: (u32, u32) = (1, 4);

/// One object of the output.
enum Output {
    /// Definition copied from the source file.
    Verbatim(ObjectId, Vec<u8>),
    Serialized(ObjectId, PdfObject),
}

/// Where the `/Names` dictionary lives.
enum NamesLocation {
    Indirect(ObjectId),
    /// Inside the catalog, or not present yet.
    Catalog,
}

/// A copy of `source` with `new_files` appended to its embedded-files name
/// tree in the given order.
///
/// Name collisions are not checked here.
pub fn clone_with_attachments(
    source: &PdfDocument,
    new_files: &[(String, Vec<u8>)],
    config: &WriterConfig,
) -> ParseResult<Vec<u8>> {
    let catalog_id = source.trailer().root()?;
    let catalog = source.catalog()?;
    let mut catalog = catalog.expect_dict("catalog")?.clone();

    let (names_location, mut names) = match catalog.get("Names") {
        Some(PdfObject::Reference(id)) => {
            let resolved = source.resolve_reference(*id)?;
            let dict = match resolved.as_dict() {
                Some(dict) => dict.clone(),
                None => {
                    tracing::warn!("catalog /Names {} is not a dictionary; replacing it", id);
                    PdfDictionary::new()
                }
            };
            (NamesLocation::Indirect(*id), dict)
        }
        Some(PdfObject::Dictionary(dict)) => (NamesLocation::Catalog, dict.clone()),
        _ => (NamesLocation::Catalog, PdfDictionary::new()),
    };

    let (existing_node, mut pairs) = match names.get("EmbeddedFiles") {
        Some(node) => {
            let pairs = name_tree_pairs(source, node)?;
            (node.as_reference(), pairs)
        }
        None => (None, Vec::new()),
    };
    tracing::debug!(
        "embedded-files tree has {} entries; adding {}",
        pairs.len(),
        new_files.len()
    );

    let mut overlay: BTreeMap<u32, Output> = BTreeMap::new();
    let mut next_number = source.max_object_number() + 1;
    let mut allocate = || {
        let id = ObjectId::new(next_number, 0);
        next_number += 1;
        id
    };

    for (name, data) in new_files {
        let stream_id = allocate();
        let spec_id = allocate();
        overlay.insert(
            stream_id.number(),
            Output::Serialized(stream_id, embedded_file_stream(data, config)?.into()),
        );
        overlay.insert(
            spec_id.number(),
            Output::Serialized(spec_id, file_specification(name, stream_id).into()),
        );
        pairs.push((name.clone(), PdfObject::Reference(spec_id)));
    }

    let node_id = existing_node.unwrap_or_else(&mut allocate);
    let node: PdfArray = pairs
        .into_iter()
        .flat_map(|(name, value)| [PdfString::from_text(&name).into(), value])
        .collect();
    let mut node_dict = PdfDictionary::new();
    node_dict.set("Names", node);
    overlay.insert(
        node_id.number(),
        Output::Serialized(node_id, node_dict.into()),
    );

    names.set("EmbeddedFiles", node_id);
    match names_location {
        NamesLocation::Indirect(names_id) => {
            overlay.insert(
                names_id.number(),
                Output::Serialized(names_id, names.into()),
            );
        }
        NamesLocation::Catalog => catalog.set("Names", names),
    }
    overlay.insert(
        catalog_id.number(),
        Output::Serialized(catalog_id, catalog.into()),
    );

    let mut objects = overlay;
    for id in source.object_ids() {
        if objects.contains_key(&id.number()) {
            continue;
        }
        match copy_object(source, id) {
            Ok(Some(output)) => {
                objects.insert(id.number(), output);
            }
            Ok(None) => {}
            Err(e) if source.options().lenient => {
                tracing::warn!("dropping unreadable object {}: {}", id, e);
            }
            Err(e) => return Err(e),
        }
    }

    write_document(source, &objects, &output_version(source.version(), config))
}

/// Copy of a source object, or `None` for objects the output must not
/// carry over.
fn copy_object(source: &PdfDocument, id: ObjectId) -> ParseResult<Option<Output>> {
    let object = source.get_object(id)?;
    if is_stale(&object) {
        tracing::debug!("not copying {}", id);
        return Ok(None);
    }

    let Some(span) = source.object_span(id)? else {
        // Lived in an object stream.
        return Ok(Some(Output::Serialized(id, (*object).clone())));
    };
    if let PdfObject::Stream(stream) = &*object {
        if !has_exact_length(source, stream) {
            tracing::debug!("rewriting {} with a corrected /Length", id);
            return Ok(Some(Output::Serialized(id, (*object).clone())));
        }
    }
    Ok(Some(Output::Verbatim(id, source.data()[span].to_vec())))
}

/// Object streams, cross-reference streams and linearization data describe
/// the source file's layout and would be wrong in the output.
fn is_stale(object: &PdfObject) -> bool {
    match object {
        PdfObject::Stream(stream) => {
            matches!(stream.dict.get_type(), Some("ObjStm" | "XRef"))
        }
        PdfObject::Dictionary(dict) => dict.contains_key("Linearized"),
        _ => false,
    }
}

fn has_exact_length(source: &PdfDocument, stream: &PdfStream) -> bool {
    let declared = source
        .resolve_optional(stream.dict.get("Length"))
        .ok()
        .flatten()
        .and_then(|length| length.as_integer());
    declared == Some(stream.data.len() as i64)
}

fn embedded_file_stream(data: &[u8], config: &WriterConfig) -> ParseResult<PdfStream> {
    let mut params = PdfDictionary::new();
    params.set("Size", data.len());
    if config.checksums {
        params.set("CheckSum", PdfString::new(md5::compute(data).0.to_vec()));
    }
    if config.timestamps {
        params.set(
            "ModDate",
            PdfString::from_text(&format_pdf_date(chrono::Utc::now())),
        );
    }

    let mut dict = PdfDictionary::new();
    dict.set("Type", PdfName::new("EmbeddedFile"));
    dict.set("Params", params);

    let mut stream = PdfStream::new(dict, data.to_vec());
    if config.compress_streams {
        compress(&mut stream)?;
    }
    Ok(stream)
}

#[cfg(feature = "compression")]
fn compress(stream: &mut PdfStream) -> std::io::Result<()> {
    stream.compress_flate()
}

#[cfg(not(feature = "compression"))]
fn compress(_stream: &mut PdfStream) -> std::io::Result<()> {
    Ok(())
}

fn file_specification(name: &str, stream_id: ObjectId) -> PdfDictionary {
    let mut ef = PdfDictionary::new();
    ef.set("F", stream_id);
    ef.set("UF", stream_id);

    let mut spec = PdfDictionary::new();
    spec.set("Type", PdfName::new("Filespec"));
    spec.set("F", PdfString::from_text(name));
    spec.set("UF", PdfString::from_text(name));
    spec.set("EF", ef);
    spec
}

fn write_document(
    source: &PdfDocument,
    objects: &BTreeMap<u32, Output>,
    version: &str,
) -> ParseResult<Vec<u8>> {
    let mut writer = PdfWriter::new_with_writer(Vec::new());
    writer.write_header(version)?;

    for output in objects.values() {
        match output {
            Output::Verbatim(id, definition) => writer.write_raw_object(*id, definition)?,
            Output::Serialized(id, object) => writer.write_object(*id, object)?,
        }
    }

    let xref_position = writer.write_xref(|number| match source.xref().get(number) {
        Some(XRefEntry::Free { generation, .. }) => *generation,
        _ => 0,
    })?;

    let mut trailer = PdfDictionary::new();
    trailer.set("Size", writer.max_object_number() as usize + 1);
    trailer.set("Root", source.trailer().root()?);
    if let Some(info) = source.trailer().info() {
        if objects.contains_key(&info.number()) {
            trailer.set("Info", info);
        }
    }
    if let Some(id) = source.trailer().id() {
        match source.resolve(id) {
            Ok(id) if id.as_array().is_some() => trailer.set("ID", Rc::unwrap_or_clone(id)),
            _ => tracing::warn!("dropping unreadable trailer /ID"),
        }
    }
    writer.write_trailer(&trailer, xref_position)?;

    let bytes = writer.into_inner();
    tracing::debug!("wrote {} objects, {} bytes", objects.len(), bytes.len());
    Ok(bytes)
}

/// The configured version, else the source's, never below 1.4.
fn output_version(source: &str, config: &WriterConfig) -> String {
    if let Some(version) = &config.pdf_version {
        return version.clone();
    }
    match parse_version(source) {
        Some(version) if version >= MIN_OUTPUT_VERSION => source.to_string(),
        _ => format!("{}.{}", MIN_OUTPUT_VERSION.0, MIN_OUTPUT_VERSION.1),
    }
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}
