use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::UiClosed;

/// Callback run once the finish report has been processed.
pub type FinishHook = Box<dyn FnOnce() + Send + 'static>;

/// Outcome of [`FinishBarrier::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Stored; dispatched when the barrier completes.
    Deferred,
    /// The barrier had already completed, so the hook ran on the caller.
    RanInline,
    /// A hook was registered earlier; this one was dropped.
    Ignored,
}

#[derive(Default)]
struct FinishState {
    processed: bool,
    hook_registered: bool,
    hook: Option<FinishHook>,
}

/// Gate that opens once the terminal callback has fully executed.
#[derive(Default)]
pub struct FinishBarrier {
    state: Mutex<FinishState>,
    processed: Condvar,
}

impl FinishBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FinishState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_processed(&self) -> bool {
        self.state().processed
    }

    /// Registers the single on-finish hook. Only the first call is honored.
    pub fn register(&self, hook: FinishHook) -> Registration {
        let mut state = self.state();
        if state.hook_registered {
            return Registration::Ignored;
        }
        state.hook_registered = true;
        if state.processed {
            drop(state);
            hook();
            Registration::RanInline
        } else {
            state.hook = Some(hook);
            Registration::Deferred
        }
    }

    /// Opens the barrier. A deferred hook is handed to `dispatch` while the
    /// lock is still held, so it is scheduled before any waiter wakes. If
    /// `dispatch` hands it back, it runs here after the lock is released.
    /// Returns `false` if the barrier was already open.
    pub fn complete(&self, dispatch: impl FnOnce(FinishHook) -> Result<(), UiClosed>) -> bool {
        let mut state = self.state();
        if state.processed {
            return false;
        }
        state.processed = true;
        let undelivered = state.hook.take().and_then(|hook| dispatch(hook).err());
        drop(state);
        self.processed.notify_all();
        if let Some(closed) = undelivered {
            (closed.into_task())();
        }
        true
    }

    /// Blocks until [`complete`](Self::complete) has run.
    pub fn wait(&self) {
        let state = self.state();
        let _state = self
            .processed
            .wait_while(state, |state| !state.processed)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Returns `true` if the barrier opened within `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state();
        while !state.processed {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .processed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}
