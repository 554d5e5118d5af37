//! Attachment operations on documents and files
//!
//! These are the entry points the CLI uses. All validation of an `add`
//! (rename keys, duplicate input names, collisions with existing
//! attachments) happens before any output is produced.

use super::{locator, Attachment};
use crate::error::{AttachmentError, Result};
use crate::output::write_atomic;
use crate::parser::{ParseError, PdfDocument};
use crate::writer::{clone_with_attachments, WriterConfig};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Label for documents that were not read from a file.
const IN_MEMORY: &str = "<memory>";

/// Renames from `original:new` tokens, keyed by input file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    renames: BTreeMap<String, String>,
}

impl RenameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `original:new` tokens. The token is split at the first `:`,
    /// so the new name may itself contain colons. A later token for the
    /// same original replaces an earlier one.
    pub fn parse<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut renames = BTreeMap::new();
        for token in tokens {
            let token = token.as_ref();
            let Some((original, new)) = token.split_once(':') else {
                return Err(AttachmentError::InvalidRename {
                    token: token.to_string(),
                    reason: "expected 'original:newname'",
                });
            };
            if original.is_empty() || new.is_empty() {
                return Err(AttachmentError::InvalidRename {
                    token: token.to_string(),
                    reason: "both original and new name must be non-empty",
                });
            }
            renames.insert(original.to_string(), new.to_string());
        }
        Ok(Self { renames })
    }

    pub fn insert(&mut self, original: impl Into<String>, new: impl Into<String>) {
        self.renames.insert(original.into(), new.into());
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.renames.get(original).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.renames.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    /// Keys that name none of `file_names`, sorted.
    pub fn unknown_keys<'a>(&self, file_names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let known: HashSet<&str> = file_names.into_iter().collect();
        self.keys()
            .filter(|key| !known.contains(key))
            .map(str::to_string)
            .collect()
    }
}

/// A file to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInput {
    /// Where the contents came from; used in messages and for the default
    /// attachment name.
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl AttachmentInput {
    pub fn new(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| AttachmentError::io(path, e))?;
        Ok(Self::new(path, data))
    }

    /// Final component of the path.
    pub fn file_name(&self) -> String {
        match self.path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => self.path.to_string_lossy().into_owned(),
        }
    }
}

fn open(path: &Path) -> Result<PdfDocument> {
    PdfDocument::open(path).map_err(|e| AttachmentError::parse(path, e))
}

fn document_path(document: &PdfDocument) -> PathBuf {
    document
        .path()
        .map_or_else(|| PathBuf::from(IN_MEMORY), Path::to_path_buf)
}

/// Every attachment of the PDF at `path`, without contents.
pub fn list_attachments(path: impl AsRef<Path>) -> Result<Vec<Attachment>> {
    list_document_attachments(&open(path.as_ref())?)
}

pub fn list_document_attachments(document: &PdfDocument) -> Result<Vec<Attachment>> {
    locator::list(document).map_err(|e| AttachmentError::parse(document_path(document), e))
}

/// The attachment called `name`, with its contents.
pub fn get_attachment(path: impl AsRef<Path>, name: &str) -> Result<Attachment> {
    get_document_attachment(&open(path.as_ref())?, name)
}

pub fn get_document_attachment(document: &PdfDocument, name: &str) -> Result<Attachment> {
    match locator::find(document, name) {
        Ok(Some(attachment)) => Ok(attachment),
        Ok(None) => Err(AttachmentError::NotFound {
            name: name.to_string(),
            path: document_path(document),
        }),
        Err(ParseError::CorruptStream(source)) => Err(AttachmentError::CorruptAttachment {
            name: name.to_string(),
            source,
        }),
        Err(e) => Err(AttachmentError::parse(document_path(document), e)),
    }
}

/// Resolve the attachment name of every input and check the names against
/// each other and against `existing`.
fn resolve_names(
    inputs: &[AttachmentInput],
    renames: &RenameMap,
    existing: &[Attachment],
) -> Result<Vec<String>> {
    let file_names: Vec<String> = inputs.iter().map(AttachmentInput::file_name).collect();
    let unknown = renames.unknown_keys(file_names.iter().map(String::as_str));
    if !unknown.is_empty() {
        return Err(AttachmentError::UnknownRenameKeys { keys: unknown });
    }

    let resolved: Vec<String> = file_names
        .iter()
        .map(|file_name| renames.get(file_name).unwrap_or(file_name).to_string())
        .collect();

    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for (name, input) in resolved.iter().zip(inputs) {
        if let Some(first) = seen.insert(name, &input.path) {
            return Err(AttachmentError::DuplicateInputName {
                name: name.clone(),
                first: first.to_path_buf(),
                second: input.path.clone(),
            });
        }
    }

    let existing: HashSet<&str> = existing.iter().map(|a| a.name.as_str()).collect();
    let collisions: Vec<String> = resolved
        .iter()
        .filter(|name| existing.contains(name.as_str()))
        .cloned()
        .collect();
    if !collisions.is_empty() {
        return Err(AttachmentError::ExistingAttachmentName { names: collisions });
    }

    Ok(resolved)
}

/// A copy of `document` with `inputs` embedded, and the number of files
/// added.
pub fn add_attachments(
    document: &PdfDocument,
    inputs: &[AttachmentInput],
    renames: &RenameMap,
    config: &WriterConfig,
) -> Result<(Vec<u8>, usize)> {
    let existing = list_document_attachments(document)?;
    let names = resolve_names(inputs, renames, &existing)?;

    let new_files: Vec<(String, Vec<u8>)> = names
        .into_iter()
        .zip(inputs)
        .map(|(name, input)| (name, input.data.clone()))
        .collect();
    let bytes = clone_with_attachments(document, &new_files, config)
        .map_err(|e| AttachmentError::parse(document_path(document), e))?;

    tracing::debug!("embedded {} files", inputs.len());
    Ok((bytes, inputs.len()))
}

/// Embed `files` into the PDF at `source` and write the result to
/// `destination`, which may be `source` itself.
pub fn add_attachments_to_file(
    source: &Path,
    files: &[PathBuf],
    renames: &RenameMap,
    destination: &Path,
    config: &WriterConfig,
) -> Result<usize> {
    let document = open(source)?;
    let inputs = files
        .iter()
        .map(AttachmentInput::read)
        .collect::<Result<Vec<_>>>()?;

    let (bytes, count) = add_attachments(&document, &inputs, renames, config)?;
    write_atomic(destination, &bytes)?;
    Ok(count)
}
