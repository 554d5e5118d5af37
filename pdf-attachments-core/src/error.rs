use crate::parser::{CorruptStreamError, ParseError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors of the attachment operations.
///
/// Every variant names the input it is about (a path or an attachment
/// name), so the message can be shown to a user as is.
#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: invalid PDF structure: {source}", path.display())]
    Structure {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("attachment '{name}' is corrupt: {source}")]
    CorruptAttachment {
        name: String,
        #[source]
        source: CorruptStreamError,
    },

    #[error("attachment '{name}' not found in {}", path.display())]
    NotFound { name: String, path: PathBuf },

    #[error(
        "duplicate attachment name '{name}' from {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateInputName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("attachment name(s) already exist in the PDF: {}", names.join(", "))]
    ExistingAttachmentName { names: Vec<String> },

    #[error("invalid rename '{token}': {reason}")]
    InvalidRename { token: String, reason: &'static str },

    #[error("rename key(s) match no input file: {}", keys.join(", "))]
    UnknownRenameKeys { keys: Vec<String> },

    #[error("attachment name '{name}' cannot be used as an output file name")]
    InvalidOutputName { name: String },
}

impl AttachmentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AttachmentError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a parser error. An I/O failure stays an I/O error so that a
    /// missing file is never reported as a broken PDF.
    pub(crate) fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        match source {
            ParseError::Io(source) => Self::io(path, source),
            source => AttachmentError::Structure {
                path: path.into(),
                source,
            },
        }
    }

    /// Whether the error is about a missing file or attachment.
    pub fn is_not_found(&self) -> bool {
        match self {
            AttachmentError::NotFound { .. } => true,
            AttachmentError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AttachmentError>;
