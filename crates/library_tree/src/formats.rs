use std::path::Path;

/// File extensions the library knows how to open, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFormats {
    books: Vec<String>,
    archives: Vec<String>,
}

const DEFAULT_BOOKS: &[&str] = &["fb2", "epub", "mobi", "txt", "rtf", "html", "htm", "pdb"];
const DEFAULT_ARCHIVES: &[&str] = &["zip", "gz", "bz2", "tar"];

impl Default for BookFormats {
    fn default() -> Self {
        Self::new(DEFAULT_BOOKS.iter().copied())
    }
}

impl BookFormats {
    /// Book extensions as given (with or without a leading dot); archive
    /// extensions stay at their defaults.
    pub fn new<I, S>(books: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            books: normalize(books),
            archives: normalize(DEFAULT_ARCHIVES.iter().copied()),
        }
    }

    pub fn is_book(&self, path: &Path) -> bool {
        matches_any(&self.books, path)
    }

    pub fn is_archive(&self, path: &Path) -> bool {
        matches_any(&self.archives, path)
    }

    pub fn book_extensions(&self) -> &[String] {
        &self.books
    }
}

fn normalize<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn matches_any(extensions: &[String], path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}
