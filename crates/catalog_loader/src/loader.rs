use std::hash::Hash;

use crate::{FinishReport, LoadError};

/// Callbacks a loader uses to report progress from inside `load`.
pub trait ItemListener<S, I> {
    /// Reports one discovered item. May schedule a UI delivery.
    fn on_new_item(&mut self, source: &S, item: I);

    /// Interrupt checkpoint. When it returns `true` the loader should stop
    /// discovering and return promptly.
    fn confirm_interrupt(&mut self) -> bool;

    /// Declares everything reported for `source` so far as final.
    fn commit_items(&mut self, source: &S);
}

/// A concrete catalog loader driven by a `LoadingCoordinator`.
///
/// `prepare` and `load` run on the worker thread; `update_items` and
/// `on_finish` run on the UI context. Implementations share state between the
/// two sides through interior mutability.
pub trait ItemsLoader: Send + Sync + 'static {
    /// Where an item came from; used only as a grouping key.
    type Source: Clone + Eq + Hash + Send + 'static;
    /// Something found by a load. Duplicates collapse in the finish report.
    type Item: Clone + Eq + Hash + Send + 'static;

    /// Label used for logging and progress display.
    fn resource_key(&self) -> &str;

    fn prepare(&self) -> Result<(), LoadError> {
        Ok(())
    }

    fn load(
        &self,
        listener: &mut dyn ItemListener<Self::Source, Self::Item>,
    ) -> Result<(), LoadError>;

    fn update_items(&self, items: Vec<Self::Item>);

    fn on_finish(&self, report: FinishReport<Self::Item>);
}
