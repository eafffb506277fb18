//! Catalog loader: background item loading coordinated with a UI context.
//!
//! A [`LoadingCoordinator`] runs an [`ItemsLoader`] on a worker thread, batches
//! the discovered items, posts periodic deliveries to a single-threaded
//! [`UiContext`], and shuts down through a two-phase finish barrier.
mod batch;
mod coordinator;
mod finish;
mod interrupt;
mod loader;
mod settings;
mod types;
mod ui;

pub use batch::ItemBuffer;
pub use coordinator::LoadingCoordinator;
pub use finish::{FinishBarrier, FinishHook, Registration};
pub use interrupt::InterruptHandshake;
pub use loader::{ItemListener, ItemsLoader};
pub use settings::LoaderSettings;
pub use types::{
    CoordinatorError, FinishKind, FinishReport, LoadError, LoadFailureKind, RunPhase, RunSummary,
};
pub use ui::{ui_channel, UiClosed, UiContext, UiHandle, UiQueue, UiTask};
