use std::fmt;
use std::io;

use thiserror::Error;

/// Failure raised by a loader's `prepare` or `load` step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LoadError {
    pub kind: LoadFailureKind,
    pub message: String,
}

impl LoadError {
    pub fn new(kind: LoadFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LoadFailureKind::Network, message)
    }

    pub fn io(err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::PermissionDenied => LoadFailureKind::PermissionDenied,
            _ => LoadFailureKind::Io,
        };
        Self::new(kind, err.to_string())
    }

    pub(crate) fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::new(LoadFailureKind::Panicked, format!("loader panicked: {detail}"))
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        Self::io(&err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailureKind {
    Network,
    Io,
    PermissionDenied,
    Panicked,
    Other,
}

impl fmt::Display for LoadFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadFailureKind::Network => write!(f, "network error"),
            LoadFailureKind::Io => write!(f, "io error"),
            LoadFailureKind::PermissionDenied => write!(f, "permission denied"),
            LoadFailureKind::Panicked => write!(f, "loader panicked"),
            LoadFailureKind::Other => write!(f, "other error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("coordinator already started (phase {0:?}); create a new one per run")]
    AlreadyStarted(RunPhase),
}

/// Worker run state machine. Each run walks these phases forward exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum RunPhase {
    #[default]
    NotStarted,
    Preparing,
    Loading,
    Draining,
    Finishing,
    Done,
}

/// What the terminal callback receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishReport<I> {
    /// `None` on success.
    pub error_message: Option<String>,
    /// `true` if the worker confirmed an interrupt request.
    pub interrupted: bool,
    /// Items whose source never committed, grouped by first-seen source.
    /// Each item appears once.
    pub uncommitted: Vec<I>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishKind {
    Completed,
    Failed,
    Interrupted,
}

impl<I> FinishReport<I> {
    pub fn kind(&self) -> FinishKind {
        if self.error_message.is_some() {
            FinishKind::Failed
        } else if self.interrupted {
            FinishKind::Interrupted
        } else {
            FinishKind::Completed
        }
    }
}

/// Returned by `LoadingCoordinator::run` once the finish callback has completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub error_message: Option<String>,
    pub interrupted: bool,
    /// Items handed to `update_items` over the whole run.
    pub delivered: usize,
    /// Items reported as uncommitted to `on_finish`.
    pub uncommitted: usize,
}
