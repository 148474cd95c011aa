//! Assembling source files into one statement using lopdf

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use log::{debug, warn};

use crate::collect::{SourceFile, SourceKind};
use crate::error::{Error, Result};
use crate::layout::{fit_to_page, PageDimensions};
use crate::pdf::raster::embed_image;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic Parent chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// Name of the image XObject on generated image pages
const IMAGE_RESOURCE: &str = "Im0";

/// Append-only builder for an output document
///
/// Pages are collected in the order they're appended. The page tree and
/// catalog are written once by [`Composer::finish`], which consumes the
/// composer.
pub struct Composer {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    page_size: PageDimensions,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    /// Empty document with A4 image pages
    pub fn new() -> Self {
        Self::with_page_size(PageDimensions::A4)
    }

    /// Empty document whose image pages have the given size
    pub fn with_page_size(page_size: PageDimensions) -> Self {
        let mut doc = Document::with_version("1.5");
        // Reserved now so every page can point at it as Parent
        let pages_id = doc.new_object_id();

        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            page_size,
        }
    }

    /// Number of pages appended so far
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Append a collected source file according to its kind
    pub fn append(&mut self, file: &SourceFile) -> Result<usize> {
        match file.kind {
            SourceKind::Pdf => self.append_pdf(&file.path),
            SourceKind::Image => self.append_image(&file.path).map(|_| 1),
        }
    }

    /// Append a file by path, classifying it by its name
    ///
    /// Unsupported files are skipped with a warning and add no pages.
    pub fn append_path(&mut self, path: &Path) -> Result<usize> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match SourceKind::from_file_name(&name) {
            Some(SourceKind::Pdf) => self.append_pdf(path),
            Some(SourceKind::Image) => self.append_image(path).map(|_| 1),
            None => {
                warn!("Unsupported file: {}", path.display());
                Ok(0)
            }
        }
    }

    /// Append every page of the PDF at `path`, in its original order
    ///
    /// Returns the number of pages added.
    pub fn append_pdf(&mut self, path: &Path) -> Result<usize> {
        let mut source = Document::load(path).map_err(|e| Error::Source {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // Move the source's object ids above everything we hold already
        source.renumber_objects_with(self.doc.max_id + 1);

        let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
        if page_ids.is_empty() {
            warn!("{} has no pages", path.display());
            return Ok(0);
        }

        for &page_id in &page_ids {
            inherit_page_attributes(&mut source, page_id)?;
        }

        for (id, object) in std::mem::take(&mut source.objects) {
            // Our own catalog and page tree replace the source's
            if is_page_tree_root_or_node(&object) {
                continue;
            }
            self.doc.objects.insert(id, object);
        }
        self.doc.max_id = self.doc.max_id.max(source.max_id);

        for &page_id in &page_ids {
            let page = self.doc.get_dictionary_mut(page_id)?;
            page.set("Parent", Object::Reference(self.pages_id));
        }

        debug!("Appended {} page(s) from {}", page_ids.len(), path.display());
        self.page_ids.extend(&page_ids);

        Ok(page_ids.len())
    }

    /// Add one page showing the image at `path`, scaled to fit the page
    pub fn append_image(&mut self, path: &Path) -> Result<()> {
        let image = embed_image(&mut self.doc, path)?;
        let placement = fit_to_page(image.width, image.height, &self.page_size);

        let [a, b, c, d, e, f] = placement.matrix();
        let content = format!(
            "q\n{} {} {} {} {} {} cm\n/{} Do\nQ\n",
            a, b, c, d, e, f, IMAGE_RESOURCE
        );
        let content_id = self.doc.add_object(Stream::new(
            Dictionary::new(),
            content.into_bytes(),
        ));

        let mut xobjects = Dictionary::new();
        xobjects.set(IMAGE_RESOURCE, Object::Reference(image.id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let media_box: Vec<Object> = self
            .page_size
            .media_box()
            .iter()
            .map(|&v| Object::Real(v))
            .collect();

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        page.set("MediaBox", Object::Array(media_box));
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(content_id));

        let page_id = self.doc.add_object(Object::Dictionary(page));
        self.page_ids.push(page_id);

        debug!(
            "Added image page for {} ({}x{} px)",
            path.display(),
            image.width,
            image.height
        );

        Ok(())
    }

    /// Write the page tree and catalog, then save to `output`
    ///
    /// Overwrites an existing file. Returns the page count of the document.
    pub fn finish(mut self, output: &Path) -> Result<usize> {
        let page_count = self.page_ids.len();

        let kids: Vec<Object> = self
            .page_ids
            .iter()
            .map(|&id| Object::Reference(id))
            .collect();

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(page_count as i64));
        pages.set("Kids", Object::Array(kids));
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(Object::Dictionary(catalog));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut info = Dictionary::new();
        info.set(
            "Producer",
            Object::string_literal(concat!("invoice-statements ", env!("CARGO_PKG_VERSION"))),
        );
        info.set(
            "CreationDate",
            Object::string_literal(Local::now().format("D:%Y%m%d%H%M%S").to_string()),
        );
        let info_id = self.doc.add_object(Object::Dictionary(info));
        self.doc.trailer.set("Info", Object::Reference(info_id));

        self.doc.compress();
        self.doc.save(output).map_err(|e| Error::Finalize {
            path: output.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(page_count)
    }
}

/// Compose `files` in the given order into a new document at `output`
///
/// The document is written next to `output` first and moved into place at
/// the end. Once `cancelled` is set, no further file is added and nothing
/// is moved into place. The flag is set here right before the move, so a
/// caller that finds it already set knows the statement is being written.
pub fn compose(files: &[SourceFile], output: &Path, cancelled: &AtomicBool) -> Result<usize> {
    let check_cancelled = || {
        if cancelled.load(Ordering::SeqCst) {
            Err(Error::Cancelled(output.to_path_buf()))
        } else {
            Ok(())
        }
    };

    let mut composer = Composer::new();
    for file in files {
        check_cancelled()?;
        debug!("Adding {} ({})", file.name, file.modified_at.format("%Y-%m-%d %H:%M:%S"));
        composer.append(file)?;
    }

    let partial = partial_path(output);
    let page_count = composer.finish(&partial)?;

    if cancelled.swap(true, Ordering::SeqCst) {
        let _ = std::fs::remove_file(&partial);
        return Err(Error::Cancelled(output.to_path_buf()));
    }

    std::fs::rename(&partial, output).map_err(|e| {
        let _ = std::fs::remove_file(&partial);
        Error::Finalize {
            path: output.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    Ok(page_count)
}

/// Hidden sibling of `output` the document is written to before it's complete
fn partial_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!(".{}.partial", name))
}

fn is_page_tree_root_or_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type").and_then(Object::as_name),
            Ok(b"Catalog") | Ok(b"Pages")
        ),
        _ => false,
    }
}

/// Copy attributes a page inherits from its ancestors onto the page itself
///
/// Pages get re-parented under a new page tree, so anything they only had
/// through their old ancestors would otherwise be lost.
fn inherit_page_attributes(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();
    {
        let page = doc.get_dictionary(page_id)?;
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;

        while let Some(parent_id) = parent {
            if depth >= MAX_TREE_DEPTH {
                break;
            }
            let Ok(node) = doc.get_dictionary(parent_id) else {
                break;
            };

            for key in INHERITABLE_KEYS {
                if page.has(key) || inherited.iter().any(|(k, _)| *k == key) {
                    continue;
                }
                if let Ok(value) = node.get(key) {
                    inherited.push((key, value.clone()));
                }
            }

            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
        }
    }

    if inherited.is_empty() {
        return Ok(());
    }

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key.to_vec(), value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Two-level page tree with MediaBox only on the root node
    fn nested_tree_document() -> Document {
        let mut doc = Document::with_version("1.5");
        let root_id = doc.new_object_id();
        let middle_id = doc.new_object_id();

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(middle_id));
        let page_id = doc.add_object(Object::Dictionary(page));

        let mut middle = Dictionary::new();
        middle.set("Type", Object::Name(b"Pages".to_vec()));
        middle.set("Parent", Object::Reference(root_id));
        middle.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
        middle.set("Count", Object::Integer(1));
        middle.set("Rotate", Object::Integer(90));
        doc.objects.insert(middle_id, Object::Dictionary(middle));

        let mut root = Dictionary::new();
        root.set("Type", Object::Name(b"Pages".to_vec()));
        root.set("Kids", Object::Array(vec![Object::Reference(middle_id)]));
        root.set("Count", Object::Integer(1));
        root.set("Rotate", Object::Integer(180));
        root.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        );
        doc.objects.insert(root_id, Object::Dictionary(root));

        doc
    }

    #[test]
    fn test_inherit_nearest_ancestor_wins() {
        let mut doc = nested_tree_document();
        let page_id = (3, 0);

        inherit_page_attributes(&mut doc, page_id).unwrap();

        let page = doc.get_dictionary(page_id).unwrap();
        assert_eq!(page.get(b"Rotate").unwrap().as_i64().unwrap(), 90);
        assert_eq!(page.get(b"MediaBox").unwrap().as_array().unwrap().len(), 4);
        assert!(!page.has(b"CropBox"));
    }

    #[test]
    fn test_page_tree_nodes_are_detected() {
        let doc = nested_tree_document();
        assert!(is_page_tree_root_or_node(doc.get_object((1, 0)).unwrap()));
        assert!(!is_page_tree_root_or_node(doc.get_object((3, 0)).unwrap()));
    }

    #[test]
    fn test_empty_composition_still_writes_document() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("empty.pdf");

        let pages = Composer::new().finish(&output).unwrap();

        assert_eq!(pages, 0);
        let doc = Document::load(&output).unwrap();
        assert!(doc.get_pages().is_empty());
    }

    #[test]
    fn test_append_path_skips_unsupported_files() {
        let temp_dir = TempDir::new().unwrap();
        let notes = temp_dir.path().join("notes.txt");
        std::fs::write(&notes, b"hello").unwrap();

        let mut composer = Composer::new();
        assert_eq!(composer.append_path(&notes).unwrap(), 0);
        assert_eq!(composer.page_count(), 0);
    }

    #[test]
    fn test_append_broken_pdf_fails() {
        let temp_dir = TempDir::new().unwrap();
        let broken = temp_dir.path().join("broken.pdf");
        std::fs::write(&broken, b"%PDF-1.4 garbage").unwrap();

        let mut composer = Composer::new();
        let result = composer.append_pdf(&broken);
        assert!(matches!(result, Err(Error::Source { .. })));
    }

    #[test]
    fn test_compose_moves_finished_document_into_place() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("statement.pdf");

        let cancelled = AtomicBool::new(false);
        let pages = compose(&[], &output, &cancelled).unwrap();

        assert_eq!(pages, 0);
        assert!(cancelled.load(Ordering::SeqCst));
        assert!(output.exists());
        assert!(!partial_path(&output).exists());
    }

    #[test]
    fn test_cancelled_compose_leaves_nothing_behind() {
        let temp_dir = TempDir::new().unwrap();
        let scan = temp_dir.path().join("scan.png");
        image::RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0]))
            .save(&scan)
            .unwrap();
        let file = SourceFile {
            name: "scan.png".to_string(),
            path: scan,
            modified_at: Local::now(),
            kind: SourceKind::Image,
        };
        let output = temp_dir.path().join("statement.pdf");

        let result = compose(&[file], &output, &AtomicBool::new(true));

        assert!(matches!(result, Err(Error::Cancelled(_))));
        assert!(!output.exists());
        assert!(!partial_path(&output).exists());
    }

    #[test]
    fn test_compose_keeps_existing_statement_when_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("statement.pdf");
        std::fs::write(&output, b"previous run").unwrap();

        let result = compose(&[], &output, &AtomicBool::new(true));

        assert!(matches!(result, Err(Error::Cancelled(_))));
        assert_eq!(std::fs::read(&output).unwrap(), b"previous run");
    }

    #[test]
    fn test_finish_into_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("missing").join("out.pdf");

        let result = Composer::new().finish(&output);
        assert!(matches!(result, Err(Error::Finalize { .. })));
    }
}
