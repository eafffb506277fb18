use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use catalog_loader::{
    FinishKind, FinishReport, ItemListener, ItemsLoader, LoadError, LoadFailureKind,
};
use chrono::Utc;
use library_tree::{BookFormats, FileTree, OpeningStatus};
use loader_logging::{loader_debug, loader_info};

/// A book file found while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookEntry {
    pub path: PathBuf,
    pub name: String,
}

/// Loads a local directory tree as a catalog: every directory is a source,
/// every recognised book file an item. A directory is committed once all of
/// its books have been reported.
pub struct DirectoryCatalog {
    key: String,
    root: PathBuf,
    formats: BookFormats,
    item_delay: Duration,
    shown: AtomicUsize,
    unfinished: Mutex<Vec<PathBuf>>,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>, formats: BookFormats) -> Self {
        let root = root.into();
        Self {
            key: format!("library:{}", root.display()),
            root,
            formats,
            item_delay: Duration::ZERO,
            shown: AtomicUsize::new(0),
            unfinished: Mutex::new(Vec::new()),
        }
    }

    pub fn with_item_delay(mut self, item_delay: Duration) -> Self {
        self.item_delay = item_delay;
        self
    }

    /// Books shown on the UI side so far.
    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::Relaxed)
    }

    /// Books from folders that were not fully listed, as of the last finish.
    pub fn unfinished(&self) -> Vec<PathBuf> {
        self.unfinished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn root_node(&self) -> FileTree {
        FileTree::root(&self.root, &self.key, None)
    }
}

impl ItemsLoader for DirectoryCatalog {
    type Source = PathBuf;
    type Item = Arc<BookEntry>;

    fn resource_key(&self) -> &str {
        &self.key
    }

    fn prepare(&self) -> Result<(), LoadError> {
        let root = self.root_node();
        if root.opening_status() == OpeningStatus::CannotOpen {
            let message = root.opening_status_message().unwrap_or("cannot open");
            return Err(LoadError::new(
                LoadFailureKind::PermissionDenied,
                format!("{message}: {}", self.root.display()),
            ));
        }
        if !root.is_directory() {
            return Err(LoadError::new(
                LoadFailureKind::Other,
                format!("not a directory: {}", self.root.display()),
            ));
        }
        Ok(())
    }

    fn load(
        &self,
        listener: &mut dyn ItemListener<PathBuf, Arc<BookEntry>>,
    ) -> Result<(), LoadError> {
        let mut queue = VecDeque::from([self.root_node()]);
        while let Some(mut dir) = queue.pop_front() {
            if listener.confirm_interrupt() {
                return Ok(());
            }
            dir.wait_for_opening(&self.formats)
                .map_err(|err| LoadError::new(LoadFailureKind::Io, err.to_string()))?;
            loader_debug!("listing {} ({} entries)", dir.tree_title(), dir.children().len());

            let source = dir.path().to_path_buf();
            for child in dir.children() {
                if child.is_directory() {
                    queue.push_back(child.clone());
                    continue;
                }
                listener.on_new_item(
                    &source,
                    Arc::new(BookEntry {
                        path: child.path().to_path_buf(),
                        name: child.name().into_owned(),
                    }),
                );
                if !self.item_delay.is_zero() {
                    thread::sleep(self.item_delay);
                }
                if listener.confirm_interrupt() {
                    return Ok(());
                }
            }
            listener.commit_items(&source);
        }
        Ok(())
    }

    fn update_items(&self, items: Vec<Arc<BookEntry>>) {
        for item in &items {
            println!("  + {}", item.name);
        }
        let total = self.shown.fetch_add(items.len(), Ordering::Relaxed) + items.len();
        println!("-- {} new, {} total", items.len(), total);
    }

    fn on_finish(&self, report: FinishReport<Arc<BookEntry>>) {
        let finished_at = Utc::now().to_rfc3339();
        match report.kind() {
            FinishKind::Completed => println!("Scan completed at {finished_at}"),
            FinishKind::Interrupted => println!("Scan interrupted at {finished_at}"),
            FinishKind::Failed => println!(
                "Scan failed at {finished_at}: {}",
                report.error_message.as_deref().unwrap_or_default()
            ),
        }
        if !report.uncommitted.is_empty() {
            println!("{} books from partially listed folders:", report.uncommitted.len());
            for item in &report.uncommitted {
                println!("  ? {}", item.path.display());
            }
        }
        *self.unfinished.lock().unwrap_or_else(PoisonError::into_inner) =
            report.uncommitted.iter().map(|item| item.path.clone()).collect();
        loader_info!(
            "{} finished: kind={:?} shown={} uncommitted={}",
            self.key,
            report.kind(),
            self.shown(),
            report.uncommitted.len()
        );
    }
}
