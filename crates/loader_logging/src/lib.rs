#![deny(missing_docs)]
//! Shared logging utilities for the catalog loader workspace.
//!
//! This crate provides the `loader_*` logging macros used across the codebase,
//! a per-thread run label that prefixes every record, and a minimal test
//! initializer for the global logger.

use std::cell::RefCell;

thread_local! {
    /// Thread-local label of the load run executing on this thread, if any.
    static RUN_LABEL: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Sets the run label for the current thread.
/// Worker threads call this with the loader's resource key before loading.
pub fn set_run_label(label: impl Into<String>) {
    let label = label.into();
    RUN_LABEL.with(|v| *v.borrow_mut() = Some(label));
}

/// Removes the run label from the current thread.
pub fn clear_run_label() {
    RUN_LABEL.with(|v| v.borrow_mut().take());
}

/// Retrieves the run label for the current thread.
/// Returns `None` if no label has been set.
pub fn run_label() -> Option<String> {
    RUN_LABEL.with(|v| v.borrow().clone())
}

/// Returns the prefix the logging macros put in front of each record.
#[doc(hidden)]
pub fn label_prefix() -> String {
    RUN_LABEL.with(|v| match v.borrow().as_deref() {
        Some(label) => format!("[{label}] "),
        None => String::new(),
    })
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! loader_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::label_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! loader_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::label_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! loader_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::label_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! loader_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::label_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! loader_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::label_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
