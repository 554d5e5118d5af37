//! PDF Parser Module
//!
//! Reads the trailer and cross-reference data of a PDF file and exposes its
//! objects through a lazily populated object store ([`PdfDocument`]).
//! Cross-reference tables, cross-reference streams, incremental updates and
//! compressed object streams are supported; encrypted files are not.

pub mod document;
pub mod filters;
pub mod lexer;
pub mod object_stream;
pub mod objects;
pub mod page_tree;
pub mod trailer;
pub mod xref;

pub use self::document::PdfDocument;
pub use self::filters::CorruptStreamError;
pub use self::page_tree::ParsedPage;
pub use self::trailer::PdfTrailer;
pub use self::xref::XRefEntry;

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid PDF header")]
    InvalidHeader,

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Invalid object reference: {0} {1} R")]
    InvalidReference(u32, u16),

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("{context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid xref table: {0}")]
    InvalidXRef(String),

    #[error("Invalid trailer: {0}")]
    InvalidTrailer(String),

    #[error("Circular reference detected at {0} {1} R")]
    CircularReference(u32, u16),

    #[error("Maximum nesting depth of {0} exceeded")]
    MaxDepthExceeded(usize),

    #[error("Stream decode error: {0}")]
    CorruptStream(#[from] CorruptStreamError),

    #[error("Malformed name tree: {0}")]
    MalformedNameTree(String),

    #[error("Encryption not supported")]
    EncryptionNotSupported,
}

impl ParseError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        ParseError::SyntaxError {
            position,
            message: message.into(),
        }
    }
}

/// Parsing behaviour switches.
///
/// Lenient parsing (the default) rebuilds a broken cross-reference index by
/// scanning the file and tolerates a wrong stream `/Length`. Strict parsing
/// fails on the first malformation instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub lenient: bool,
    /// Maximum nesting of arrays and dictionaries inside one object.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParseOptions {
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    pub fn strict() -> Self {
        Self {
            lenient: false,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }

    pub fn lenient() -> Self {
        Self {
            lenient: true,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
pub(crate) mod test_helpers;
