//! Logging shim (§6 "External interfaces"), grounded on
//! `original_source/library/src/log.c`'s `colopresso_log`/
//! `cpres_set_log_callback`.
//!
//! The original keeps a single process-wide callback slot. This crate logs
//! through the `log` facade everywhere internally; `set_callback` is kept
//! only as a compatibility seam for embedders that still want a single
//! sink, by installing a `log::Log` implementation that forwards to it.

use std::sync::{Mutex, OnceLock};

/// Severity mirroring `original_source/library/include/colopresso.h`'s
/// `cpres_log_level_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

pub type LogCallback = Box<dyn Fn(LogLevel, &str) + Send + Sync + 'static>;

static CALLBACK: OnceLock<Mutex<Option<LogCallback>>> = OnceLock::new();

fn callback_slot() -> &'static Mutex<Option<LogCallback>> {
    CALLBACK.get_or_init(|| Mutex::new(None))
}

/// Installs a single global log callback, replacing any previous one.
pub fn set_callback(callback: LogCallback) {
    *callback_slot().lock().unwrap() = Some(callback);
}

pub fn clear_callback() {
    *callback_slot().lock().unwrap() = None;
}

pub(crate) fn dispatch(level: LogLevel, message: &str) {
    log::log!(level.into(), "{message}");
    if let Some(callback) = callback_slot().lock().unwrap().as_ref() {
        callback(level, message);
    }
}
