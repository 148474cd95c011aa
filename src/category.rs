//! Invoice directions

use std::fmt;

/// Direction of the invoices in a category directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Incoming,
    Outgoing,
}

impl Category {
    /// Every category processed per run
    pub const ALL: [Category; 2] = [Category::Incoming, Category::Outgoing];

    /// Name of the category directory inside a month directory
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Incoming => "incoming",
            Category::Outgoing => "outgoing",
        }
    }

    /// Label used in output filenames
    pub fn label(self) -> &'static str {
        match self {
            Category::Incoming => "eingehend",
            Category::Outgoing => "ausgehend",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
