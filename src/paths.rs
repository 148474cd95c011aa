//! Folder layout and output naming
//!
//! The expected layout is `ROOT_DIR/<month>/<category>/*.{pdf,jpg,jpeg,png}`,
//! with one statement per category written to `ROOT_DIR/<month>/`.

use std::path::{Path, PathBuf};

use crate::category::Category;
use crate::month::Month;

/// Fixed first segment of every output filename
pub const FILE_PREFIX: &str = "rechnungen";

/// Extension of generated statements
pub const OUTPUT_EXTENSION: &str = "pdf";

/// Directory holding all category folders of a month
pub fn month_dir(root: &Path, month: Month) -> PathBuf {
    root.join(month.dir_name())
}

/// Directory holding the source files of one category
pub fn category_dir(root: &Path, month: Month, category: Category) -> PathBuf {
    month_dir(root, month).join(category.dir_name())
}

/// Filename of a statement: `{prefix}_{category}_{name?}_{month}.pdf`
///
/// The name segment and its separator are left out when no user name is set.
pub fn output_file_name(category: Category, month: Month, user_name: Option<&str>) -> String {
    match user_name {
        Some(name) => format!(
            "{}_{}_{}_{}.{}",
            FILE_PREFIX,
            category.label(),
            name,
            month.label(),
            OUTPUT_EXTENSION
        ),
        None => format!(
            "{}_{}_{}.{}",
            FILE_PREFIX,
            category.label(),
            month.label(),
            OUTPUT_EXTENSION
        ),
    }
}

/// Full path of the statement for a category
pub fn output_path(root: &Path, month: Month, category: Category, user_name: Option<&str>) -> PathBuf {
    month_dir(root, month).join(output_file_name(category, month, user_name))
}

/// Whether `path` is an existing, accessible directory
pub async fn is_accessible_dir(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata.is_dir(),
        Err(_) => false,
    }
}
