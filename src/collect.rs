//! Source file discovery and chronological ordering

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use futures::future::join_all;
use glob::Pattern;
use log::{debug, warn};

use crate::error::{Error, Result};

/// Supported filename patterns, matched case-sensitively
const SOURCE_GLOBS: [(&str, SourceKind); 4] = [
    ("*.pdf", SourceKind::Pdf),
    ("*.jpg", SourceKind::Image),
    ("*.jpeg", SourceKind::Image),
    ("*.png", SourceKind::Image),
];

static SOURCE_PATTERNS: LazyLock<[(Pattern, SourceKind); 4]> = LazyLock::new(|| {
    SOURCE_GLOBS.map(|(glob, kind)| {
        let pattern = Pattern::new(glob).expect("source globs are valid patterns");
        (pattern, kind)
    })
});

/// How a source file ends up in the statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// All pages are appended as they are
    Pdf,
    /// Rendered onto one new page
    Image,
}

impl SourceKind {
    /// Kind for a filename, or `None` if the file is not a supported invoice
    pub fn from_file_name(name: &str) -> Option<SourceKind> {
        SOURCE_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.matches(name))
            .map(|(_, kind)| *kind)
    }
}

/// An invoice file found in a category directory
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub name: String,
    pub path: PathBuf,
    pub modified_at: DateTime<Local>,
    pub kind: SourceKind,
}

/// List supported invoice files in `dir`, in directory-listing order
///
/// Fails with [`Error::CategoryAccess`] if the directory can't be read. Files
/// whose metadata can't be read are logged and left out.
pub async fn collect_files(dir: &Path) -> Result<Vec<SourceFile>> {
    let access_error = |source| Error::CategoryAccess {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(access_error)?;
    let mut candidates = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(access_error)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        match SourceKind::from_file_name(&name) {
            Some(kind) => candidates.push((name, entry.path(), kind)),
            None => debug!("Ignoring {}", entry.path().display()),
        }
    }

    // Stat everything at once, keeping the listing order
    let stats = join_all(
        candidates
            .iter()
            .map(|(_, path, _)| modified_time(path)),
    )
    .await;

    let mut files = Vec::with_capacity(candidates.len());
    for ((name, path, kind), stat) in candidates.into_iter().zip(stats) {
        match stat {
            Ok(Some(modified_at)) => files.push(SourceFile {
                name,
                path,
                modified_at,
                kind,
            }),
            Ok(None) => debug!("Skipping {}: not a regular file", path.display()),
            Err(e) => warn!("Skipping file: {}", e),
        }
    }

    Ok(files)
}

/// Modification time of a regular file, `None` for anything else
async fn modified_time(path: &Path) -> Result<Option<DateTime<Local>>> {
    let stat_error = |source| Error::FileStat {
        path: path.to_path_buf(),
        source,
    };

    let metadata = tokio::fs::metadata(path).await.map_err(stat_error)?;
    if !metadata.is_file() {
        return Ok(None);
    }

    let modified = metadata.modified().map_err(stat_error)?;
    Ok(Some(DateTime::<Local>::from(modified)))
}

/// Sort files oldest first; equal timestamps keep their current order
pub fn sort_chronologically(files: &mut [SourceFile]) {
    files.sort_by_key(|file| file.modified_at);
}
