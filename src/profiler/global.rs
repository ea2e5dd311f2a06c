//! Process-Wide Profiler
//!
//! A single [`Profiler`] shared by the whole process, built lazily from
//! the environment configuration the first time it is touched. Every
//! call holds the lock for its full duration, so calls from several
//! threads are serialised rather than interleaved.
//!
//! # Example
//!
//! ```rust,no_run
//! use pointprof::profiler::global;
//!
//! global::checkpoint("start");
//! global::checkpoint_in("load config", "init");
//! global::trace("after init");
//! global::checkpoint("done");
//!
//! let text = global::report(true);
//! assert!(text.starts_with("<!--"));
//! ```

use std::panic::Location;
use std::sync::{Mutex, MutexGuard};

use log::debug;
use once_cell::sync::Lazy;

use crate::config::ProfilerConfig;

use super::state::Profiler;

/// The shared profiler instance.
static PROFILER: Lazy<Mutex<Profiler>> = Lazy::new(|| {
    let config = ProfilerConfig::from_env_or_default();
    debug!(
        "Profiler initialised (enabled: {}, log output: {}, memory limit: {} MB)",
        config.enabled, config.log_output, config.memory_limit_mb
    );
    Mutex::new(Profiler::with_config(&config))
});

fn lock() -> MutexGuard<'static, Profiler> {
    PROFILER.lock().unwrap_or_else(|e| e.into_inner())
}

/// Runs `f` with exclusive access to the shared profiler.
pub fn with_profiler<R>(f: impl FnOnce(&mut Profiler) -> R) -> R {
    f(&mut lock())
}

/// Applies a configuration to the shared profiler.
pub fn configure(config: &ProfilerConfig) {
    lock().apply_config(config);
}

/// Turns recording on or off.
pub fn enable(enabled: bool) {
    lock().enable(enabled);
}

/// Returns true if recording is on.
pub fn is_enabled() -> bool {
    lock().is_enabled()
}

/// Turns diagnostic output on or off.
pub fn set_log_output(log_output: bool) {
    lock().set_log_output(log_output);
}

/// Records a checkpoint in the default group.
pub fn checkpoint(name: &str) {
    lock().checkpoint(name);
}

/// Records a checkpoint in `group`.
pub fn checkpoint_in(name: &str, group: &str) {
    lock().checkpoint_in(name, group);
}

/// Captures the call stack under `label`, or under the caller's
/// `file:line` when the label is empty.
#[track_caller]
pub fn trace(label: &str) {
    let caller = Location::caller();
    lock().trace_from(label, caller);
}

/// Renders the report, printing it to stdout when `print` is set.
pub fn report(print: bool) -> String {
    lock().report(print)
}

/// Clears all recorded data.
pub fn reset() {
    lock().reset();
}
