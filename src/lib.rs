//! Invoice Statements Library
//!
//! Combines a month's invoice files into one PDF statement per direction.
//! Invoices are expected in `ROOT_DIR/<month>/<category>/` as PDF, JPEG or
//! PNG files. This library provides functionality to:
//! - Resolve month and category directories and statement filenames
//! - Collect supported files and order them by modification time
//! - Compose PDFs (all pages) and images (one A4 page each) into one document
//! - Run all categories of a month independently of each other
//!
//! # Example
//!
//! ```no_run
//! use invoice_statements::month::Month;
//! use invoice_statements::run::{run, RunConfig};
//!
//! # async fn example() -> invoice_statements::Result<()> {
//! let config = RunConfig::new("/home/me/invoices", Month::March);
//! let report = run(&config).await?;
//!
//! for statement in report.statements() {
//!     println!("{}: {} pages", statement.output_path.display(), statement.page_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod category;
pub mod collect;
pub mod error;
pub mod layout;
pub mod month;
pub mod paths;
pub mod pdf;
pub mod run;

// Re-export commonly used items
pub use category::Category;
pub use error::{Error, Result};
pub use month::Month;
