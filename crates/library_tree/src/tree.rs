use std::borrow::Cow;
use std::cmp::Ordering;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::BookFormats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpeningStatus {
    CannotOpen,
    /// Contents may change on disk, so they are re-read on every opening.
    AlwaysReloadBeforeOpening,
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("cannot list {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A node of the local library tree backed by a file or directory.
#[derive(Debug, Clone)]
pub struct FileTree {
    path: PathBuf,
    name: Option<String>,
    summary: Option<String>,
    selectable: bool,
    is_directory: bool,
    children: Vec<FileTree>,
}

impl FileTree {
    /// Top-level entry with a display name, e.g. "My books".
    pub fn root(path: impl Into<PathBuf>, name: impl Into<String>, summary: Option<String>) -> Self {
        let path = path.into();
        Self {
            is_directory: path.is_dir(),
            path,
            name: Some(name.into()),
            summary,
            selectable: false,
            children: Vec::new(),
        }
    }

    pub fn child(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            is_directory: path.is_dir(),
            path,
            name: None,
            summary: None,
            selectable: true,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> Cow<'_, str> {
        match &self.name {
            Some(name) => Cow::Borrowed(name),
            None => self
                .path
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_else(|| self.path.to_string_lossy()),
        }
    }

    pub fn tree_title(&self) -> Cow<'_, str> {
        self.path.to_string_lossy()
    }

    pub fn string_id(&self) -> Cow<'_, str> {
        self.path.to_string_lossy()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn is_selectable(&self) -> bool {
        self.selectable
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn children(&self) -> &[FileTree] {
        &self.children
    }

    pub fn opening_status(&self) -> OpeningStatus {
        let readable = if self.is_directory {
            fs::read_dir(&self.path).is_ok()
        } else {
            File::open(&self.path).is_ok()
        };
        if readable {
            OpeningStatus::AlwaysReloadBeforeOpening
        } else {
            OpeningStatus::CannotOpen
        }
    }

    pub fn opening_status_message(&self) -> Option<&'static str> {
        match self.opening_status() {
            OpeningStatus::CannotOpen => Some("permissionDenied"),
            OpeningStatus::AlwaysReloadBeforeOpening => None,
        }
    }

    /// Re-reads the directory: keeps subdirectories, archives and recognised
    /// books, sorted. Book files have no children and are left untouched.
    pub fn wait_for_opening(&mut self, formats: &BookFormats) -> Result<(), TreeError> {
        if !self.is_directory {
            return Ok(());
        }
        self.children.clear();

        let read_err = |source| TreeError::ReadDir {
            path: self.path.clone(),
            source,
        };
        let mut children = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if path.is_dir() || formats.is_archive(&path) || formats.is_book(&path) {
                children.push(FileTree::child(path));
            }
        }
        children.sort();
        self.children = children;
        Ok(())
    }
}

impl PartialEq for FileTree {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileTree {}

impl Ord for FileTree {
    /// Directories first, then by case-insensitive name.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .is_directory
            .cmp(&self.is_directory)
            .then_with(|| {
                self.name()
                    .to_lowercase()
                    .cmp(&other.name().to_lowercase())
            })
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for FileTree {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
