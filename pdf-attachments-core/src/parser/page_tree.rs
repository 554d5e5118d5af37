//! PDF Page Tree navigation
//!
//! Enumerates the leaf pages of `/Root /Pages`. Intermediate `/Pages` nodes
//! are walked depth-first through `/Kids` in array order, so pages come out
//! in document order. Nodes already visited are skipped, which keeps a
//! malformed tree with a `/Kids` loop from running forever.

use super::document::PdfDocument;
use super::ParseResult;
use crate::objects::{ObjectId, PdfDictionary};
use std::collections::HashSet;

/// A leaf page of the page tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    /// 1-based page number.
    pub number: u32,
    /// Object the page dictionary lives in; `None` for a direct kid.
    pub id: Option<ObjectId>,
    pub dict: PdfDictionary,
}

/// Every leaf page of `document`, in page order. A catalog without
/// `/Pages` has no pages.
pub fn collect_pages(document: &PdfDocument) -> ParseResult<Vec<ParsedPage>> {
    let catalog = document.catalog()?;
    let catalog = catalog.expect_dict("catalog")?;
    let Some(root) = catalog.get("Pages") else {
        tracing::debug!("catalog has no /Pages");
        return Ok(Vec::new());
    };

    let mut pages = Vec::new();
    let mut visited = HashSet::new();
    // Nodes are pushed in reverse so the first kid is popped first.
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        let id = node.as_reference();
        if let Some(id) = id {
            if !visited.insert(id) {
                tracing::warn!("page tree node {} visited twice; skipping", id);
                continue;
            }
        }

        let resolved = match document.resolve(&node) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!("skipping unreadable page tree node: {}", e);
                continue;
            }
        };
        let Some(dict) = resolved.as_dict() else {
            tracing::warn!(
                "page tree node is a {}, not a dictionary; skipping",
                resolved.type_name()
            );
            continue;
        };

        match dict.get("Kids") {
            Some(kids) if dict.get_type() != Some("Page") => {
                let kids = document.resolve(kids)?;
                match kids.as_array() {
                    Some(kids) => stack.extend(kids.iter().rev().cloned()),
                    None => tracing::warn!("page tree /Kids is not an array; skipping"),
                }
            }
            _ => {
                if dict.get_type().is_some_and(|t| t != "Page") {
                    tracing::debug!("treating /Type /{:?} leaf as a page", dict.get_type());
                }
                pages.push(ParsedPage {
                    number: pages.len() as u32 + 1,
                    id,
                    dict: dict.clone(),
                });
            }
        }
    }

    tracing::debug!("page tree has {} pages", pages.len());
    Ok(pages)
}
