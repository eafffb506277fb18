use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct InterruptFlags {
    requested: bool,
    confirmed: bool,
}

/// Cooperative stop protocol between an external controller and the worker.
///
/// The controller only ever *requests*; the worker *confirms* at its own
/// checkpoints. Once confirmed, the interruption sticks and cannot be resumed.
#[derive(Debug, Default)]
pub struct InterruptHandshake {
    flags: Mutex<InterruptFlags>,
}

impl InterruptHandshake {
    pub fn new() -> Self {
        Self::default()
    }

    fn flags(&self) -> MutexGuard<'_, InterruptFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Asks the worker to stop. Safe from any thread, any number of times.
    pub fn request(&self) {
        self.flags().requested = true;
    }

    /// Worker checkpoint: latches a pending request and reports whether the
    /// worker must stop.
    pub fn confirm(&self) -> bool {
        let mut flags = self.flags();
        if flags.requested {
            flags.confirmed = true;
        }
        flags.confirmed
    }

    /// Withdraws a pending request. Fails once the worker has confirmed it.
    pub fn try_resume(&self) -> bool {
        let mut flags = self.flags();
        if flags.confirmed {
            return false;
        }
        flags.requested = false;
        true
    }

    pub fn is_requested(&self) -> bool {
        self.flags().requested
    }

    /// Whether the interruption actually took effect.
    pub fn is_interrupted(&self) -> bool {
        self.flags().confirmed
    }
}
