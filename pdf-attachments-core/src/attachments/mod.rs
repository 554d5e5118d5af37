//! File attachments
//!
//! Attachments live in two places in a PDF:
//!
//! - the document-level embedded-files name tree
//!   (`/Root /Names /EmbeddedFiles`), and
//! - `/FileAttachment` annotations on individual pages.
//!
//! [`locator`] finds them in a parsed document and [`service`] provides the
//! `list`, `get` and `add` operations on files.

pub mod locator;
pub mod service;

pub use locator::{find, list};
pub use service::{
    add_attachments, add_attachments_to_file, get_attachment, get_document_attachment,
    list_attachments, list_document_attachments, AttachmentInput, RenameMap,
};

use crate::error::{AttachmentError, Result};
use std::fmt;
use std::path::PathBuf;

/// An attachment found in a document.
///
/// This is an independent copy; it does not borrow from the document it
/// came from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Attachment {
    pub name: String,
    /// Declared `/Params /Size`, else the decoded length, else unknown.
    pub size: Option<u64>,
    /// Empty when the file specification has no description.
    pub description: String,
    /// 1-based page number; `None` for document-level attachments.
    pub page: Option<u32>,
    /// File contents. Only filled in by [`find`].
    #[cfg_attr(feature = "serde", serde(skip))]
    pub data: Option<Vec<u8>>,
}

impl Attachment {
    pub fn is_page_level(&self) -> bool {
        self.page.is_some()
    }

    /// File name to extract the attachment to when no destination is given.
    ///
    /// Directory components of the stored name are dropped, so a hostile
    /// name such as `../../etc/passwd` still lands in the current directory.
    pub fn default_output_path(&self) -> Result<PathBuf> {
        let file_name = self
            .name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        if file_name.is_empty() || file_name == "." || file_name == ".." {
            return Err(AttachmentError::InvalidOutputName {
                name: self.name.clone(),
            });
        }
        Ok(PathBuf::from(file_name))
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {}", self.name)?;
        if let Some(page) = self.page {
            write!(f, " (page {page})")?;
        }
        match self.size {
            Some(size) => write!(f, "  \u{2014}  {size} bytes")?,
            None => write!(f, "  \u{2014}  unknown")?,
        }
        if !self.description.is_empty() {
            write!(f, "\n    {}", self.description)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attachment(name: &str) -> Attachment {
        Attachment {
            name: name.to_string(),
            size: Some(5),
            description: String::new(),
            page: None,
            data: None,
        }
    }

    #[test]
    fn test_display_document_level() {
        assert_eq!(
            attachment("notes.txt").to_string(),
            "  notes.txt  \u{2014}  5 bytes"
        );
    }

    #[test]
    fn test_display_page_level_with_description() {
        let mut a = attachment("scan.png");
        a.page = Some(3);
        a.size = None;
        a.description = "Original scan".to_string();
        assert_eq!(
            a.to_string(),
            "  scan.png (page 3)  \u{2014}  unknown\n    Original scan"
        );
        assert!(a.is_page_level());
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            attachment("data.csv").default_output_path().unwrap(),
            PathBuf::from("data.csv")
        );
        assert_eq!(
            attachment("../../etc/passwd").default_output_path().unwrap(),
            PathBuf::from("passwd")
        );
        assert_eq!(
            attachment("C:\\temp\\report.txt").default_output_path().unwrap(),
            PathBuf::from("report.txt")
        );
    }

    #[test]
    fn test_default_output_path_rejects_directories() {
        for name in ["", "dir/", "..", "a/.."] {
            assert!(
                matches!(
                    attachment(name).default_output_path(),
                    Err(AttachmentError::InvalidOutputName { .. })
                ),
                "{name:?} should be rejected"
            );
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize_skips_data() {
        let mut a = attachment("a.bin");
        a.data = Some(vec![1, 2, 3]);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "a.bin",
                "size": 5,
                "description": "",
                "page": null
            })
        );
    }
}
