//! Diagnostics for the command line tool.
//!
//! Messages go to stderr and, once [`set_log_file`] has been called, are also
//! appended to that file tagged with their level. A thread-local prefix
//! (usually the input being processed) is prepended to every message.

use std::cell::RefCell;
use std::fmt::Display;
use std::fs::File;
use std::io::{Result as IoResult, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();

thread_local! {
    static INPUT_PREFIX: RefCell<Option<String>> = const { RefCell::new(None) };
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Warning,
    Error,
}

impl Level {
    const fn tag(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

fn current_prefix() -> Option<String> {
    INPUT_PREFIX.with(|prefix| prefix.borrow().clone())
}

fn prefixed(message: impl Display) -> String {
    current_prefix().map_or_else(|| message.to_string(), |p| format!("{p}: {message}"))
}

fn emit(level: Level, message: &str) {
    let message = prefixed(message);
    eprintln!("{message}");
    if let Some(file) = LOG_FILE.get()
        && let Ok(mut file) = file.lock()
    {
        let _ = writeln!(file, "{}: {message}", level.tag());
    }
}

/// Mirrors warnings and errors into `path`, creating parent directories.
/// Only the first call takes effect.
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub fn set_log_file(path: &Path) -> IoResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let _ = LOG_FILE.set(Mutex::new(file));
    Ok(())
}

/// Prefixes messages on this thread with `prefix` until the guard drops.
#[must_use = "the prefix is removed when the guard is dropped"]
pub fn set_log_prefix(prefix: impl Into<String>) -> LogPrefixGuard {
    let previous = INPUT_PREFIX.with(|slot| slot.borrow_mut().replace(prefix.into()));
    LogPrefixGuard { previous }
}

pub struct LogPrefixGuard {
    previous: Option<String>,
}

impl Drop for LogPrefixGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        INPUT_PREFIX.with(|slot| *slot.borrow_mut() = previous);
    }
}

pub fn log_warn(message: &str) {
    emit(Level::Warning, message);
}

pub fn log_error(message: &str) {
    emit(Level::Error, message);
}
