//! Page counting for generated statements

use std::path::Path;

use lopdf::{Document, Object};

use crate::error::{Error, Result};

/// Count field of the root Pages node, if the document has a sane one
fn count_from_catalog(doc: &Document) -> Option<usize> {
    let catalog = doc.catalog().ok()?;
    let pages_id = catalog.get(b"Pages").and_then(Object::as_reference).ok()?;
    let count = doc
        .get_dictionary(pages_id)
        .ok()?
        .get(b"Count")
        .and_then(Object::as_i64)
        .ok()?;

    usize::try_from(count).ok()
}

/// Number of pages in a loaded document
///
/// Prefers the page tree's own Count and falls back to walking the tree.
pub fn page_count_of(doc: &Document) -> usize {
    count_from_catalog(doc).unwrap_or_else(|| doc.get_pages().len())
}

/// Number of pages in the PDF at `path`
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    Ok(page_count_of(&doc))
}
