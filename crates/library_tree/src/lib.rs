//! Library tree: filesystem-backed nodes for browsing local book storage.
mod formats;
mod tree;

pub use formats::BookFormats;
pub use tree::{FileTree, OpeningStatus, TreeError};
