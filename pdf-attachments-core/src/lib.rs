//! # pdf-attachments
//!
//! List, extract and add file attachments in PDF documents, built on a small
//! native PDF object-graph reader and writer.
//!
//! ## Features
//!
//! - **Document-level attachments**: the `/EmbeddedFiles` name tree, including
//!   trees split over `/Kids` nodes
//! - **Page-level attachments**: `/FileAttachment` annotations
//! - **Parsing**: classic cross-reference tables, cross-reference streams,
//!   incremental updates, hybrid files and compressed object streams, with
//!   recovery for damaged cross-reference data
//! - **Filters**: Flate (with PNG/TIFF predictors), LZW, ASCIIHex, ASCII85,
//!   RunLength
//! - **Writing**: a complete copy of the source with new embedded files and
//!   a fresh cross-reference table, written atomically
//!
//! Encrypted documents are rejected.
//!
//! ## Quick Start
//!
//! ### Listing attachments
//!
//! ```rust,no_run
//! use pdf_attachments::list_attachments;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! for attachment in list_attachments("report.pdf")? {
//!     println!("{attachment}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Extracting one attachment
//!
//! ```rust,no_run
//! use pdf_attachments::get_attachment;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let attachment = get_attachment("report.pdf", "data.csv")?;
//! let path = attachment.default_output_path()?;
//! std::fs::write(&path, attachment.data.unwrap_or_default())?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Adding attachments
//!
//! ```rust,no_run
//! use pdf_attachments::{add_attachments_to_file, RenameMap, WriterConfig};
//! use std::path::{Path, PathBuf};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let renames = RenameMap::parse(["notes.txt:README.txt"])?;
//! let added = add_attachments_to_file(
//!     Path::new("report.pdf"),
//!     &[PathBuf::from("notes.txt"), PathBuf::from("data.csv")],
//!     &renames,
//!     Path::new("report-with-files.pdf"),
//!     &WriterConfig::default(),
//! )?;
//! println!("Added {added} attachment(s)");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`attachments`] - attachment discovery and the list/get/add operations
//! - [`parser`] - PDF parsing and the lazily loaded object store
//!   - [`parser::PdfDocument`] - parsed document
//!   - [`parser::filters`] - stream decoding
//! - [`objects`] - PDF object model
//! - [`writer`] - object serialization and document cloning
//! - [`output`] - atomic file replacement

pub mod attachments;
pub mod compression;
pub mod error;
pub mod objects;
pub mod output;
pub mod parser;
pub mod writer;

pub use attachments::{
    add_attachments, add_attachments_to_file, get_attachment, get_document_attachment,
    list_attachments, list_document_attachments, Attachment, AttachmentInput, RenameMap,
};
pub use error::{AttachmentError, Result};
pub use objects::{ObjectId, PdfArray, PdfDictionary, PdfName, PdfObject, PdfStream, PdfString};
pub use parser::{CorruptStreamError, ParseError, ParseOptions, PdfDocument};
pub use writer::{clone_with_attachments, WriterConfig};

/// Current version of pdf-attachments
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_reexports_work_together() {
        let doc = PdfDocument::parse(parser::test_helpers::minimal_pdf()).unwrap();
        assert!(list_document_attachments(&doc).unwrap().is_empty());
        let (bytes, count) = add_attachments(
            &doc,
            &[AttachmentInput::new("a.txt", b"a".to_vec())],
            &RenameMap::new(),
            &WriterConfig::default(),
        )
        .unwrap();
        assert_eq!(count, 1);
        let output = PdfDocument::parse(bytes).unwrap();
        assert_eq!(list_document_attachments(&output).unwrap().len(), 1);
    }
}
