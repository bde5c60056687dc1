//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` / `debug!` macros for formatted terminal output with colored prefixes
//! - `BuildLog`, the logging capability handed to the build pipeline
//! - `ConsoleLog` and `SilentLog` implementations
//!
//! The pipeline never logs through global state: every component receives
//! an `Arc<dyn BuildLog>` at construction time. The macros are for the
//! binary and for `ConsoleLog` itself.
//!
//! # Example
//!
//! ```ignore
//! log!("build"; "versioned {} files", count);
//! debug!("serve"; "miss: {}", path);
//! ```

use owo_colors::OwoColorize;
use std::{
    error::Error,
    io::{Write, stderr, stdout},
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    // Errors go to stderr so piping `hashmark build` output stays clean
    if module_lower == "error" {
        let mut err = stderr().lock();
        writeln!(err, "{prefix} {message}").ok();
        err.flush().ok();
    } else {
        let mut out = stdout().lock();
        writeln!(out, "{prefix} {message}").ok();
        out.flush().ok();
    }
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "serve" => prefix.bright_blue().bold().to_string(),
        "build" => prefix.bright_green().bold().to_string(),
        "warn" => prefix.bright_magenta().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

/// Render an error and its source chain on one line (`a: b: c`).
pub fn error_chain(error: &dyn Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

// ============================================================================
// Build Log Capability
// ============================================================================

/// Logging capability passed explicitly through the build pipeline.
///
/// Implementations must be cheap to call from concurrent tasks.
pub trait BuildLog: Send + Sync {
    /// Progress detail (file added, stage started, ...).
    fn verbose(&self, message: &str);

    /// Something unexpected that does not fail the build.
    fn warn(&self, message: &str);

    /// A failure, optionally with the underlying error.
    fn error(&self, message: &str, error: Option<&dyn Error>);
}

/// Terminal logger built on the `log!` output format.
///
/// Verbose messages are printed only when `verbose` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleLog {
    pub verbose: bool,
}

impl ConsoleLog {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl BuildLog for ConsoleLog {
    fn verbose(&self, message: &str) {
        if self.verbose {
            log("verbose", message);
        }
    }

    fn warn(&self, message: &str) {
        log("warn", message);
    }

    fn error(&self, message: &str, error: Option<&dyn Error>) {
        match error {
            Some(e) => log("error", &format!("{message}: {}", error_chain(e))),
            None => log("error", message),
        }
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentLog;

impl BuildLog for SilentLog {
    fn verbose(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str, _error: Option<&dyn Error>) {}
}

/// Logger that keeps every message, for assertions in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingLog {
    pub(crate) lines: parking_lot::Mutex<Vec<(&'static str, String)>>,
}

#[cfg(test)]
impl RecordingLog {
    pub(crate) fn count(&self, level: &str) -> usize {
        self.lines.lock().iter().filter(|(l, _)| *l == level).count()
    }

    pub(crate) fn contains(&self, level: &str, needle: &str) -> bool {
        self.lines
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

#[cfg(test)]
impl BuildLog for RecordingLog {
    fn verbose(&self, message: &str) {
        self.lines.lock().push(("verbose", message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.lines.lock().push(("warn", message.to_string()));
    }

    fn error(&self, message: &str, error: Option<&dyn Error>) {
        let line = match error {
            Some(e) => format!("{message}: {}", error_chain(e)),
            None => message.to_string(),
        };
        self.lines.lock().push(("error", line));
    }
}

// ============================================================================
// Tests
// ============================================================================
