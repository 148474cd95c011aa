//! PDF composition module

pub mod compose;
pub mod metadata;
pub mod raster;

// Re-export commonly used items
pub use compose::{compose, Composer};
pub use metadata::{count_pages, page_count_of};
pub use raster::{add_image, embed_image, EmbeddedImage};
