//! Error types for invoice statement generation

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the invoice statements library
#[derive(Error, Debug)]
pub enum Error {
    /// Root directory missing or not a directory
    #[error("Couldn't access {}. Does it exist?", .0.display())]
    RootDirectory(PathBuf),

    /// Month directory missing or not a directory
    #[error("Couldn't access month directory {}. Does it exist?", .0.display())]
    MonthDirectory(PathBuf),

    /// Category directory missing or unreadable
    #[error("Couldn't access {}: {source}", .path.display())]
    CategoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the modification time of a single file failed
    #[error("Couldn't read file metadata of {}: {source}", .path.display())]
    FileStat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input PDF or image could not be loaded
    #[error("Couldn't read {}: {reason}", .path.display())]
    Source { path: PathBuf, reason: String },

    /// Writing the output document failed
    #[error("Couldn't write {}: {reason}", .path.display())]
    Finalize { path: PathBuf, reason: String },

    /// A category job ran past the configured bound
    #[error("Timed out after {seconds}s while processing {category}")]
    Timeout { category: String, seconds: u64 },

    /// Composition was stopped before the output was moved into place
    #[error("Stopped before writing {}", .0.display())]
    Cancelled(PathBuf),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Unknown month name
    #[error("Unknown month: {0}")]
    InvalidMonth(String),

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// General error
    #[error("{0}")]
    General(String),
}
