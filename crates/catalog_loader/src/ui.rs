use std::fmt;
use std::sync::mpsc;
use std::time::Duration;

use thiserror::Error;

/// Unit of work executed on the UI context.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Returned when the UI context no longer accepts work. Carries the task back.
#[derive(Error)]
#[error("ui context is closed")]
pub struct UiClosed(pub UiTask);

impl UiClosed {
    pub fn into_task(self) -> UiTask {
        self.0
    }
}

impl fmt::Debug for UiClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UiClosed(..)")
    }
}

/// Single-threaded, message-driven execution context owned by the UI.
///
/// Implementations must run posted tasks one at a time, in submission order,
/// and never on the posting thread.
pub trait UiContext: Send + Sync {
    fn post(&self, task: UiTask) -> Result<(), UiClosed>;
}

/// Creates a UI context backed by a channel. The handle posts, the queue runs.
pub fn ui_channel() -> (UiHandle, UiQueue) {
    let (tx, rx) = mpsc::channel();
    (UiHandle { tx }, UiQueue { rx })
}

#[derive(Clone)]
pub struct UiHandle {
    tx: mpsc::Sender<UiTask>,
}

impl UiContext for UiHandle {
    fn post(&self, task: UiTask) -> Result<(), UiClosed> {
        self.tx.send(task).map_err(|err| UiClosed(err.0))
    }
}

/// Consumer side of [`ui_channel`]. Drive it from the thread that owns the UI.
pub struct UiQueue {
    rx: mpsc::Receiver<UiTask>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(20);

impl UiQueue {
    /// Runs every task queued so far without blocking. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Runs tasks as they arrive until `done` returns true, then drains what is
    /// already queued.
    pub fn run_until(&self, mut done: impl FnMut() -> bool) -> usize {
        let mut ran = 0;
        while !done() {
            match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => return ran,
            }
        }
        ran + self.run_pending()
    }

    /// Runs tasks until every [`UiHandle`] has been dropped.
    pub fn run_until_closed(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.recv() {
            task();
            ran += 1;
        }
        ran
    }
}
