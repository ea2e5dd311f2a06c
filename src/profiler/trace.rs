//! Stack Trace Capture
//!
//! Snapshots of the call stack taken on demand and stored under a
//! label. Capturing goes through [`StackCapture`] so hosts without
//! symbol information (or tests) can supply their own frames.

use serde::Serialize;

/// One captured stack frame. Every field is optional because symbol
/// information may be partial or missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceEntry {
    pub file: Option<String>,
    pub line: Option<u32>,
    /// Path of the type or module owning the function
    pub class_name: Option<String>,
    pub function_name: Option<String>,
    /// Separator between class and function, e.g. `::`
    pub call_type: Option<String>,
}

impl TraceEntry {
    /// Builds an entry from a demangled symbol path such as
    /// `my_app::db::Pool::get`.
    pub fn from_symbol(path: &str, file: Option<String>, line: Option<u32>) -> Self {
        let (class_name, function_name) = match split_symbol(path) {
            Some((owner, function)) => (Some(owner.to_string()), Some(function.to_string())),
            None if path.is_empty() => (None, None),
            None => (None, Some(path.to_string())),
        };
        let call_type = class_name.as_ref().map(|_| "::".to_string());

        Self {
            file,
            line,
            class_name,
            function_name,
            call_type,
        }
    }
}

/// Splits a symbol path at its last top-level `::`.
///
/// Separators nested in `<...>` (trait impls, generics) are ignored.
fn split_symbol(path: &str) -> Option<(&str, &str)> {
    let bytes = path.as_bytes();
    let mut depth = 0usize;
    let mut split = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                split = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    let at = split?;
    let (owner, function) = (&path[..at], &path[at + 2..]);
    if owner.is_empty() || function.is_empty() {
        return None;
    }
    Some((owner, function))
}

/// Formats a frame as `file:line <Class::function>`.
///
/// Missing pieces are left out; the angle bracket segment disappears
/// entirely when neither class nor function is known.
pub fn format_frame(entry: &TraceEntry) -> String {
    let mut out = String::new();

    if let Some(file) = entry.file.as_deref().filter(|f| !f.is_empty()) {
        out.push_str(file);
    }
    if let Some(line) = entry.line.filter(|l| *l != 0) {
        out.push(':');
        out.push_str(&line.to_string());
    }

    let class = entry.class_name.as_deref().filter(|c| !c.is_empty());
    let function = entry.function_name.as_deref().filter(|f| !f.is_empty());

    if class.is_some() || function.is_some() {
        out.push_str(" <");
        if let Some(class) = class {
            out.push_str(class);
        }
        if let Some(function) = function {
            if class.is_some() {
                if let Some(call_type) = entry.call_type.as_deref() {
                    out.push_str(call_type);
                }
            }
            out.push_str(function);
        }
        out.push('>');
    }

    out
}

/// Derives a trace label from a caller location.
pub fn caller_label(file: &str, line: u32) -> String {
    if file.is_empty() {
        return "default".to_string();
    }
    format!("{}:{}", file, line)
}

/// A labelled sequence of captured frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trace {
    pub label: String,
    pub entries: Vec<TraceEntry>,
}

/// Captures the current call stack.
pub trait StackCapture: Send {
    /// Returns frames innermost first.
    fn capture(&self) -> Vec<TraceEntry>;
}

/// Captures real stacks through the `backtrace` crate.
///
/// Frames belonging to the capture itself are dropped so the snapshot
/// starts at the profiler entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceCapture;

impl StackCapture for BacktraceCapture {
    fn capture(&self) -> Vec<TraceEntry> {
        let backtrace = backtrace::Backtrace::new();
        let mut resolved = Vec::new();

        for frame in backtrace.frames() {
            for symbol in frame.symbols() {
                let name = symbol
                    .name()
                    .map(|n| format!("{:#}", n))
                    .unwrap_or_default();
                let file = symbol.filename().map(|p| p.display().to_string());
                let entry = TraceEntry::from_symbol(&name, file, symbol.lineno());
                resolved.push((name, entry));
            }
        }

        let start = resolved
            .iter()
            .rposition(|(name, _)| is_capture_frame(name))
            .map_or(0, |i| i + 1);
        resolved.into_iter().skip(start).map(|(_, entry)| entry).collect()
    }
}

fn is_capture_frame(name: &str) -> bool {
    name.starts_with("backtrace::") || name.contains("BacktraceCapture")
}

/// Returns the same frames on every capture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedCapture(pub Vec<TraceEntry>);

impl StackCapture for FixedCapture {
    fn capture(&self) -> Vec<TraceEntry> {
        self.0.clone()
    }
}

/// Trace buckets in order of first use.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    traces: Vec<Trace>,
}

impl TraceLog {
    /// Creates an empty trace log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends frames to the bucket for `label`, creating it if needed.
    pub fn append(&mut self, label: &str, entries: Vec<TraceEntry>) {
        match self.traces.iter_mut().find(|t| t.label == label) {
            Some(trace) => trace.entries.extend(entries),
            None => self.traces.push(Trace {
                label: label.to_string(),
                entries,
            }),
        }
    }

    /// Returns all traces.
    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    /// Looks up a trace by label.
    pub fn get(&self, label: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.label == label)
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn clear(&mut self) {
        self.traces.clear();
    }
}
