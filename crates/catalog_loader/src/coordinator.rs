use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use loader_logging::{
    clear_run_label, loader_debug, loader_info, loader_trace, loader_warn, set_run_label,
};

use crate::{
    CoordinatorError, FinishBarrier, FinishReport, InterruptHandshake, ItemBuffer, ItemListener,
    ItemsLoader, LoadError, LoaderSettings, Registration, RunPhase, RunSummary, UiContext, UiTask,
};

/// Drives one load run of an [`ItemsLoader`] and coordinates it with the UI.
///
/// Cloning is cheap and every clone controls the same run, so a controller
/// can keep one clone for interrupting while the worker thread owns another.
/// A coordinator runs at most once.
pub struct LoadingCoordinator<L: ItemsLoader> {
    inner: Arc<Inner<L>>,
}

impl<L: ItemsLoader> Clone for LoadingCoordinator<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<L: ItemsLoader> {
    loader: L,
    ui: Box<dyn UiContext>,
    settings: LoaderSettings,
    interrupt: Arc<InterruptHandshake>,
    items: ItemBuffer<L::Source, L::Item>,
    finish: FinishBarrier,
    phase: Mutex<RunPhase>,
    reported_uncommitted: AtomicUsize,
}

impl<L: ItemsLoader> LoadingCoordinator<L> {
    pub fn new(loader: L, ui: impl UiContext + 'static, settings: LoaderSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                loader,
                ui: Box::new(ui),
                settings,
                interrupt: Arc::new(InterruptHandshake::new()),
                items: ItemBuffer::new(),
                finish: FinishBarrier::new(),
                phase: Mutex::new(RunPhase::NotStarted),
                reported_uncommitted: AtomicUsize::new(0),
            }),
        }
    }

    pub fn loader(&self) -> &L {
        &self.inner.loader
    }

    pub fn resource_key(&self) -> &str {
        self.inner.loader.resource_key()
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.inner.settings
    }

    pub fn phase(&self) -> RunPhase {
        *self.inner.phase()
    }

    pub fn request_interrupt(&self) {
        let interrupt = &self.inner.interrupt;
        if interrupt.is_requested() {
            loader_trace!("interrupt already pending for {}", self.resource_key());
        } else {
            loader_debug!("interrupt requested for {}", self.resource_key());
        }
        interrupt.request();
    }

    pub fn try_resume(&self) -> bool {
        self.inner.interrupt.try_resume()
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupt.is_interrupted()
    }

    /// Shared handle for controllers that should not hold the whole coordinator.
    pub fn interrupt_handle(&self) -> Arc<InterruptHandshake> {
        Arc::clone(&self.inner.interrupt)
    }

    pub fn add_item(&self, source: &L::Source, item: L::Item) {
        self.inner.items.add_item(source, item);
    }

    pub fn commit_items(&self, source: &L::Source) {
        let released = self.inner.items.commit_items(source);
        loader_trace!("committed {} items", released);
    }

    pub fn pending_len(&self) -> usize {
        self.inner.items.pending_len()
    }

    /// Registers the single on-finish callback. Runs it right away if the
    /// finish report was already processed; later registrations are ignored.
    pub fn register_on_finish(&self, callback: impl FnOnce() + Send + 'static) -> Registration {
        let registration = self.inner.finish.register(Box::new(callback));
        if registration == Registration::Ignored {
            loader_debug!("on-finish callback already registered; ignoring");
        }
        registration
    }

    pub fn is_finish_processed(&self) -> bool {
        self.inner.finish.is_processed()
    }

    /// Blocks until every discovered item has been handed to `update_items`.
    pub fn await_items_processed(&self) {
        self.inner.items.wait_drained();
    }

    /// Blocks until `on_finish` has returned.
    pub fn await_finish_processed(&self) {
        self.inner.finish.wait();
    }

    /// Starts [`run`](Self::run) on a dedicated worker thread.
    pub fn spawn(&self) -> io::Result<JoinHandle<Result<RunSummary, CoordinatorError>>> {
        let coordinator = self.clone();
        thread::Builder::new()
            .name("items-loader".to_string())
            .spawn(move || coordinator.run())
    }

    /// Executes the whole run protocol on the calling thread. Load failures
    /// and panics end up in the finish report; only a second `run` errors.
    pub fn run(&self) -> Result<RunSummary, CoordinatorError> {
        self.inner.begin()?;
        set_run_label(self.resource_key());
        let summary = self.run_protocol();
        clear_run_label();
        Ok(summary)
    }

    fn run_protocol(&self) -> RunSummary {
        let inner = &self.inner;
        loader_debug!("preparing");

        let (error_message, interrupted) = match guarded(|| inner.loader.prepare()) {
            Err(err) => {
                loader_warn!("preparation failed: {}", err);
                (Some(err.to_string()), false)
            }
            Ok(()) => {
                inner.set_phase(RunPhase::Loading);
                let mut listener = RunListener::new(self);
                let loaded = guarded(|| inner.loader.load(&mut listener));
                match &loaded {
                    Ok(()) => loader_debug!("loading ended after {} items", listener.discovered),
                    Err(err) => loader_warn!(
                        "loading failed after {} items: {}",
                        listener.discovered,
                        err
                    ),
                }

                inner.set_phase(RunPhase::Draining);
                self.schedule_delivery();
                self.await_items_processed();
                (loaded.err().map(|err| err.to_string()), self.is_interrupted())
            }
        };

        inner.set_phase(RunPhase::Finishing);
        self.notify_load_finished(error_message.clone(), interrupted);
        self.await_finish_processed();
        inner.set_phase(RunPhase::Done);

        let summary = RunSummary {
            error_message,
            interrupted,
            delivered: inner.items.delivered(),
            uncommitted: inner.reported_uncommitted.load(Ordering::Acquire),
        };
        loader_info!(
            "run finished: delivered={} uncommitted={} interrupted={} error={:?}",
            summary.delivered,
            summary.uncommitted,
            summary.interrupted,
            summary.error_message
        );
        summary
    }

    fn schedule_delivery(&self) {
        let inner = Arc::clone(&self.inner);
        self.inner.post(Box::new(move || inner.deliver_pending()));
    }

    fn notify_load_finished(&self, error_message: Option<String>, interrupted: bool) {
        let inner = Arc::clone(&self.inner);
        self.inner
            .post(Box::new(move || inner.process_finish(error_message, interrupted)));
    }
}

impl<L: ItemsLoader> Inner<L> {
    fn phase(&self) -> MutexGuard<'_, RunPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<(), CoordinatorError> {
        let mut phase = self.phase();
        if *phase != RunPhase::NotStarted {
            return Err(CoordinatorError::AlreadyStarted(*phase));
        }
        *phase = RunPhase::Preparing;
        Ok(())
    }

    fn set_phase(&self, next: RunPhase) {
        loader_debug!("phase -> {:?}", next);
        *self.phase() = next;
    }

    /// Queues `task` on the UI context. If the UI is gone the task runs here,
    /// otherwise the barriers would never open.
    fn post(&self, task: UiTask) {
        if let Err(closed) = self.ui.post(task) {
            loader_warn!("{}; running task on the worker", closed);
            (closed.into_task())();
        }
    }

    fn deliver_pending(&self) {
        let count = self
            .items
            .deliver(|batch| contained("update_items", || self.loader.update_items(batch)));
        loader_trace!("delivered batch of {} items", count);
    }

    fn process_finish(&self, error_message: Option<String>, interrupted: bool) {
        let uncommitted = self.items.uncommitted_snapshot();
        self.reported_uncommitted.store(uncommitted.len(), Ordering::Release);
        contained("on_finish", || {
            self.loader.on_finish(FinishReport {
                error_message,
                interrupted,
                uncommitted,
            })
        });
        self.finish.complete(|hook| self.ui.post(hook));
    }
}

/// Converts a panic in loader code into a load failure.
fn guarded(step: impl FnOnce() -> Result<(), LoadError>) -> Result<(), LoadError> {
    panic::catch_unwind(AssertUnwindSafe(step))
        .unwrap_or_else(|payload| Err(LoadError::panicked(payload.as_ref())))
}

/// Runs a UI-side callback. A panic is logged and swallowed so the
/// barriers still open and the UI loop keeps running.
fn contained(callback: &str, step: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(step)) {
        loader_warn!("{} failed: {}", callback, LoadError::panicked(payload.as_ref()));
    }
}

/// Listener handed to `ItemsLoader::load` for one run.
struct RunListener<'a, L: ItemsLoader> {
    coordinator: &'a LoadingCoordinator<L>,
    /// `None` until the first item, which always schedules a delivery.
    next_flush: Option<Instant>,
    discovered: usize,
}

impl<'a, L: ItemsLoader> RunListener<'a, L> {
    fn new(coordinator: &'a LoadingCoordinator<L>) -> Self {
        Self {
            coordinator,
            next_flush: None,
            discovered: 0,
        }
    }
}

impl<L: ItemsLoader> ItemListener<L::Source, L::Item> for RunListener<'_, L> {
    fn on_new_item(&mut self, source: &L::Source, item: L::Item) {
        self.coordinator.add_item(source, item);
        self.discovered += 1;

        let now = Instant::now();
        if self.next_flush.is_none_or(|at| now >= at) {
            self.coordinator.schedule_delivery();
            self.next_flush = Some(now + self.coordinator.settings().update_interval);
        }
    }

    fn confirm_interrupt(&mut self) -> bool {
        let confirmed = self.coordinator.inner.interrupt.confirm();
        if confirmed {
            loader_debug!("interrupt confirmed after {} items", self.discovered);
        }
        confirmed
    }

    fn commit_items(&mut self, source: &L::Source) {
        self.coordinator.commit_items(source);
    }
}
