//! Diagnostic Log Output
//!
//! Line-oriented sinks that mirror profiler events as they happen.
//! Every line is framed with [`LOG_SEPARATOR`] on both sides so the
//! entries stand out in a shared error log.

use std::env;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Marker written before and after each diagnostic message.
pub const LOG_SEPARATOR: &str = " *** ";

/// Log target used by [`LogSink`].
pub const LOG_TARGET: &str = "pointprof";

/// Frames a message with the separator.
pub fn wrap_line(message: &str) -> String {
    format!("{LOG_SEPARATOR}{message}{LOG_SEPARATOR}")
}

/// A destination for diagnostic lines.
///
/// Implementations are best-effort: a failed write is dropped,
/// never reported back to the profiler.
pub trait DiagnosticSink: Send {
    /// Emits one already framed line.
    fn emit(&mut self, line: &str);
}

/// Forwards lines to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&mut self, line: &str) {
        log::info!(target: LOG_TARGET, "{}", line);
    }
}

/// Writes lines directly to standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn emit(&mut self, line: &str) {
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }
}

/// Keeps lines in memory.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every line emitted so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Discards the buffered lines.
    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&mut self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.to_string());
    }
}

/// Metadata about the request being served, when there is one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Served over TLS
    pub https: bool,
    /// Host header
    pub host: Option<String>,
    /// Request path and query
    pub uri: Option<String>,
}

impl RequestContext {
    /// Reads CGI-style variables (`HTTPS`, `HTTP_HOST`, `REQUEST_URI`).
    ///
    /// Returns `None` unless `REQUEST_URI` is set.
    pub fn from_env() -> Option<Self> {
        let uri = env::var("REQUEST_URI").ok()?;
        Some(Self {
            https: env::var_os("HTTPS").is_some(),
            host: env::var("HTTP_HOST").ok(),
            uri: Some(uri),
        })
    }

    /// Rebuilds the request URL, leaving out unknown parts.
    ///
    /// Returns `None` when no URI is known.
    pub fn url(&self) -> Option<String> {
        let uri = self.uri.as_deref()?;
        let scheme = if self.https { "https://" } else { "http://" };
        Some(format!(
            "{}{}{}",
            scheme,
            self.host.as_deref().unwrap_or(""),
            uri
        ))
    }
}
