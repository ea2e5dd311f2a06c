//! Profiler Instance
//!
//! Owns the event log, the trace buckets and the two process switches
//! (recording and diagnostic output). Host access (clock, memory,
//! stack, log sink) goes through injected collaborators so the same
//! profiler runs against real readings or deterministic fakes.
//!
//! # Example
//!
//! ```rust
//! use pointprof::Profiler;
//!
//! let mut profiler = Profiler::new();
//! profiler.checkpoint("start");
//! profiler.checkpoint_in("query", "db");
//! profiler.checkpoint("end");
//!
//! let report = profiler.report(false);
//! assert!(report.contains("DEFAULT"));
//! assert!(report.contains("TOTAL RUNTIME"));
//! ```

use std::io::Write;
use std::panic::Location;
use std::time::Duration;

use chrono::Local;
use log::{debug, warn};
use serde::Serialize;

use crate::config::ProfilerConfig;
use crate::diagnostics::{wrap_line, DiagnosticSink, LogSink, RequestContext};
use crate::monitoring::{Clock, MemorySampler, ResourceMonitor, SystemClock};
use crate::report::composer::{compose, total_runtime_line};

use super::checkpoint::{format_secs, Group};
use super::events::EventLog;
use super::trace::{caller_label, format_frame, BacktraceCapture, StackCapture, Trace, TraceLog};

/// Format of the session start timestamp.
const SESSION_TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Checkpoint and trace recorder.
pub struct Profiler {
    events: EventLog,
    traces: TraceLog,
    enabled: bool,
    log_output: bool,
    clock: Box<dyn Clock>,
    memory: Box<dyn MemorySampler>,
    stack: Box<dyn StackCapture>,
    sink: Box<dyn DiagnosticSink>,
    request: Option<RequestContext>,
}

/// Serializable copy of the recorded state.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSnapshot {
    pub enabled: bool,
    pub total_secs: f64,
    pub groups: Vec<Group>,
    pub traces: Vec<Trace>,
}

impl Profiler {
    /// Creates an enabled profiler reading the host clock and memory.
    pub fn new() -> Self {
        Self::with_config(&ProfilerConfig::default())
    }

    /// Creates a profiler from a configuration.
    pub fn with_config(config: &ProfilerConfig) -> Self {
        Self {
            events: EventLog::new(),
            traces: TraceLog::new(),
            enabled: config.enabled,
            log_output: config.log_output,
            clock: Box::new(SystemClock::new()),
            memory: Box::new(ResourceMonitor::new().with_limit_mb(config.memory_limit_mb)),
            stack: Box::new(BacktraceCapture),
            sink: Box::new(LogSink),
            request: RequestContext::from_env(),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replaces the memory sampler.
    pub fn with_memory_sampler(mut self, sampler: impl MemorySampler + 'static) -> Self {
        self.memory = Box::new(sampler);
        self
    }

    /// Replaces the stack capture.
    pub fn with_stack_capture(mut self, capture: impl StackCapture + 'static) -> Self {
        self.stack = Box::new(capture);
        self
    }

    /// Replaces the diagnostic sink.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Sets the request reported in the session start lines.
    pub fn set_request_context(&mut self, request: Option<RequestContext>) {
        self.request = request;
    }

    /// Applies the switches and memory limit of a configuration.
    ///
    /// The current memory sampler is kept; samplers reporting their own
    /// ceiling ignore the limit.
    pub fn apply_config(&mut self, config: &ProfilerConfig) {
        self.enabled = config.enabled;
        self.log_output = config.log_output;
        self.memory.set_limit_mb(config.memory_limit_mb);
    }

    /// Turns recording on or off.
    pub fn enable(&mut self, enabled: bool) {
        debug!("Profiler {}", if enabled { "enabled" } else { "disabled" });
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turns diagnostic output on or off.
    pub fn set_log_output(&mut self, log_output: bool) {
        self.log_output = log_output;
    }

    pub fn is_log_enabled(&self) -> bool {
        self.log_output
    }

    /// Records a checkpoint in the default group.
    pub fn checkpoint(&mut self, name: &str) {
        self.checkpoint_in(name, "");
    }

    /// Records a checkpoint in `group`.
    ///
    /// Does nothing while disabled.
    pub fn checkpoint_in(&mut self, name: &str, group: &str) {
        if !self.enabled {
            return;
        }
        self.announce_session();

        let now = self.clock.now();
        let memory = self.memory.sample();
        let checkpoint = self.events.record(name, group, now, memory);

        if self.log_output {
            let mut parts = vec![format!("Profiler event: \"{}\"", checkpoint.name)];
            if !group.is_empty() {
                parts.push(format!("Group: {}", group));
            }
            parts.push(format!("Time: {}", format_secs(checkpoint.elapsed_since_last)));
            parts.push(format!("Overall: {}", format_secs(checkpoint.cumulative_elapsed)));
            let message = parts.join(",");
            self.emit(&message);
        }
    }

    /// Captures the current call stack under `label`.
    ///
    /// An empty label is replaced by the caller's `file:line`.
    /// Repeated traces under one label accumulate. A capture without
    /// frames records nothing.
    #[track_caller]
    pub fn trace(&mut self, label: &str) {
        let caller = Location::caller();
        self.trace_from(label, caller);
    }

    /// Captures the call stack, deriving empty labels from `caller`.
    pub fn trace_from(&mut self, label: &str, caller: &Location<'_>) {
        if !self.enabled {
            return;
        }
        self.announce_session();

        let label = if label.is_empty() {
            caller_label(caller.file(), caller.line())
        } else {
            label.to_string()
        };
        let entries = self.stack.capture();
        if entries.is_empty() {
            debug!("No stack frames captured for trace \"{}\"", label);
            return;
        }

        if self.log_output {
            self.emit(&format!("Trace: \"{}\":", label));
            for entry in &entries {
                self.emit(&format_frame(entry));
            }
            self.emit(&format!("End of trace: \"{}\"", label));
        }

        self.traces.append(&label, entries);
    }

    /// Renders the report.
    ///
    /// Returns an empty string while disabled. With `print` set the
    /// report is also written to standard output.
    pub fn report(&mut self, print: bool) -> String {
        if !self.enabled {
            return String::new();
        }

        let report = compose(&self.events, &self.traces);

        if self.log_output {
            let total = total_runtime_line(&self.events);
            self.emit(&total);
        }

        if print {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(report.as_bytes()).and_then(|_| stdout.flush()) {
                warn!("Failed to print profiler report: {}", e);
            }
        }

        report
    }

    /// Clears all checkpoints and traces and restarts timing.
    ///
    /// The switches are left as they are.
    pub fn reset(&mut self) {
        debug!("Profiler reset ({} checkpoints dropped)", self.events.len());
        self.events.clear();
        self.traces.clear();
    }

    /// Returns the checkpoint groups in order of first use.
    pub fn groups(&self) -> &[Group] {
        self.events.groups()
    }

    /// Looks up a checkpoint group.
    pub fn group(&self, label: &str) -> Option<&Group> {
        self.events.group(label)
    }

    /// Returns the recorded traces.
    pub fn traces(&self) -> &[Trace] {
        self.traces.traces()
    }

    /// Looks up a trace bucket.
    pub fn trace_bucket(&self, label: &str) -> Option<&Trace> {
        self.traces.get(label)
    }

    /// Returns the running total of checkpoint deltas.
    pub fn total_elapsed(&self) -> Duration {
        self.events.total()
    }

    /// Copies the recorded state into a serializable form.
    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            enabled: self.enabled,
            total_secs: self.events.total().as_secs_f64(),
            groups: self.events.groups().to_vec(),
            traces: self.traces.traces().to_vec(),
        }
    }

    /// Emits the session start lines before the first event.
    fn announce_session(&mut self) {
        if !self.log_output || !self.events.is_empty() || !self.traces.is_empty() {
            return;
        }

        let started = format!("Profiler instance: {}", Local::now().format(SESSION_TIME_FORMAT));
        self.emit(&started);

        if let Some(url) = self.request.as_ref().and_then(RequestContext::url) {
            self.emit(&format!("URL: {}", url));
        }
    }

    fn emit(&mut self, message: &str) {
        self.sink.emit(&wrap_line(message));
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Profiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profiler")
            .field("enabled", &self.enabled)
            .field("log_output", &self.log_output)
            .field("checkpoints", &self.events.len())
            .field("traces", &self.traces.traces().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::monitoring::{FixedMemory, ManualClock};
    use crate::profiler::trace::{FixedCapture, TraceEntry};
    use std::thread;

    fn frames() -> Vec<TraceEntry> {
        vec![
            TraceEntry::from_symbol("app::handler", Some("src/handler.rs".into()), Some(10)),
            TraceEntry::from_symbol("main", Some("src/main.rs".into()), Some(3)),
        ]
    }

    fn fake_profiler() -> (Profiler, ManualClock, MemorySink) {
        let clock = ManualClock::new();
        let sink = MemorySink::new();
        let profiler = Profiler::new()
            .with_clock(clock.clone())
            .with_memory_sampler(FixedMemory::new(32.0, 128))
            .with_stack_capture(FixedCapture(frames()))
            .with_sink(sink.clone());
        (profiler, clock, sink)
    }

    #[test]
    fn test_profiler_defaults() {
        let profiler = Profiler::new();
        assert!(profiler.is_enabled());
        assert!(!profiler.is_log_enabled());
        assert!(profiler.groups().is_empty());
        assert!(profiler.traces().is_empty());
    }

    #[test]
    fn test_with_config() {
        let config = ProfilerConfig {
            enabled: false,
            log_output: true,
            memory_limit_mb: 64,
        };
        let profiler = Profiler::with_config(&config);
        assert!(!profiler.is_enabled());
        assert!(profiler.is_log_enabled());
    }

    #[test]
    fn test_checkpoint_sleep_example() {
        let mut profiler = Profiler::new();
        profiler.checkpoint("start");
        thread::sleep(Duration::from_millis(10));
        profiler.checkpoint("end");

        let group = profiler.group("").unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group.checkpoints[0].elapsed_since_last, Duration::ZERO);

        let end = &group.checkpoints[1];
        assert!(end.elapsed_since_last >= Duration::from_millis(10));
        assert!(end.elapsed_since_last < Duration::from_millis(500));
        assert_eq!(end.cumulative_elapsed, end.elapsed_since_last);
    }

    #[test]
    fn test_checkpoint_attaches_memory() {
        let (mut profiler, _, _) = fake_profiler();
        profiler.checkpoint("m");

        let cp = &profiler.group("").unwrap().checkpoints[0];
        assert_eq!(cp.memory_used_mb, 32.0);
        assert_eq!(cp.memory_limit_mb, 128);
        assert_eq!(cp.memory_percent, Some(25.0));
    }

    #[test]
    fn test_memory_percent_omitted_when_unlimited() {
        let mut profiler = Profiler::new().with_memory_sampler(FixedMemory::new(48.0, 0));
        profiler.checkpoint("m");

        let cp = &profiler.group("").unwrap().checkpoints[0];
        assert_eq!(cp.memory_percent, None);
        assert!(!profiler.report(false).contains("memory_percent"));
    }

    #[test]
    fn test_deltas_follow_clock() {
        let (mut profiler, clock, _) = fake_profiler();
        clock.set(Duration::from_secs(100));
        profiler.checkpoint("a");
        clock.advance(Duration::from_millis(40));
        profiler.checkpoint_in("b", "io");
        clock.advance(Duration::from_millis(60));
        profiler.checkpoint("c");

        let default = profiler.group("").unwrap();
        assert_eq!(default.checkpoints[0].elapsed_since_last, Duration::ZERO);
        assert_eq!(default.checkpoints[1].elapsed_since_last, Duration::from_millis(60));
        assert_eq!(default.checkpoints[1].cumulative_elapsed, Duration::from_millis(100));
        assert_eq!(profiler.total_elapsed(), Duration::from_millis(100));
    }

    #[test]
    fn test_reset_behaves_like_fresh_start() {
        let (mut profiler, clock, _) = fake_profiler();
        profiler.checkpoint("a");
        clock.advance(Duration::from_millis(25));
        profiler.checkpoint("b");
        profiler.trace("t");
        profiler.set_log_output(true);

        profiler.reset();
        assert!(profiler.groups().is_empty());
        assert!(profiler.traces().is_empty());
        assert_eq!(profiler.total_elapsed(), Duration::ZERO);
        assert!(profiler.is_enabled());
        assert!(profiler.is_log_enabled());

        clock.advance(Duration::from_millis(70));
        profiler.checkpoint("fresh");
        let cp = &profiler.group("").unwrap().checkpoints[0];
        assert_eq!(cp.elapsed_since_last, Duration::ZERO);
        assert_eq!(cp.cumulative_elapsed, Duration::ZERO);
    }

    #[test]
    fn test_disabled_profiler_is_inert() {
        let (mut profiler, clock, sink) = fake_profiler();
        profiler.set_log_output(true);
        profiler.enable(false);

        profiler.checkpoint("a");
        clock.advance(Duration::from_millis(5));
        profiler.checkpoint_in("b", "g");
        profiler.trace("t");
        let report = profiler.report(true);

        assert!(report.is_empty());
        assert!(profiler.groups().is_empty());
        assert!(profiler.traces().is_empty());
        assert!(sink.lines().is_empty());

        // The cursor did not move while disabled
        profiler.enable(true);
        profiler.checkpoint("c");
        assert_eq!(
            profiler.group("").unwrap().checkpoints[0].elapsed_since_last,
            Duration::ZERO
        );
    }

    #[test]
    fn test_trace_accumulates_under_label() {
        let (mut profiler, _, _) = fake_profiler();
        profiler.trace("mytrace");
        profiler.trace("mytrace");

        assert_eq!(profiler.traces().len(), 1);
        assert_eq!(profiler.trace_bucket("mytrace").unwrap().entries.len(), 4);
    }

    #[test]
    fn test_trace_label_from_caller() {
        let (mut profiler, _, _) = fake_profiler();
        let line = line!() + 1;
        profiler.trace("");

        let expected = format!("{}:{}", file!(), line);
        assert!(profiler.trace_bucket(&expected).is_some());
    }

    #[test]
    fn test_trace_from_keeps_explicit_label() {
        let (mut profiler, _, _) = fake_profiler();
        let location = Location::caller();
        profiler.trace_from("named", location);
        assert!(profiler.trace_bucket("named").is_some());
    }

    #[test]
    fn test_checkpoint_log_lines() {
        let (mut profiler, clock, sink) = fake_profiler();
        profiler.set_log_output(true);
        profiler.set_request_context(Some(RequestContext {
            https: true,
            host: Some("example.com".to_string()),
            uri: Some("/page".to_string()),
        }));

        profiler.checkpoint("start");
        clock.advance(Duration::from_millis(10));
        profiler.checkpoint_in("query", "db");

        let lines = sink.lines();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with(" *** Profiler instance: "));
        assert_eq!(lines[1], " *** URL: https://example.com/page *** ");
        assert_eq!(
            lines[2],
            " *** Profiler event: \"start\",Time: 0.000000,Overall: 0.000000 *** "
        );
        assert_eq!(
            lines[3],
            " *** Profiler event: \"query\",Group: db,Time: 0.010000,Overall: 0.010000 *** "
        );
    }

    #[test]
    fn test_session_lines_once_per_session() {
        let (mut profiler, _, sink) = fake_profiler();
        profiler.set_log_output(true);
        profiler.set_request_context(None);

        profiler.checkpoint("a");
        profiler.checkpoint("b");
        let starts = |lines: &[String]| {
            lines
                .iter()
                .filter(|l| l.contains("Profiler instance:"))
                .count()
        };
        assert_eq!(starts(&sink.lines()), 1);

        profiler.reset();
        profiler.checkpoint("c");
        assert_eq!(starts(&sink.lines()), 2);
    }

    #[test]
    fn test_trace_log_lines() {
        let (mut profiler, _, sink) = fake_profiler();
        profiler.set_request_context(None);
        profiler.checkpoint("a");
        profiler.set_log_output(true);
        profiler.trace("boot");

        let lines = sink.lines();
        assert_eq!(
            lines,
            vec![
                " *** Trace: \"boot\": *** ",
                " *** src/handler.rs:10 <app::handler> *** ",
                " *** src/main.rs:3 <main> *** ",
                " *** End of trace: \"boot\" *** ",
            ]
        );
    }

    #[test]
    fn test_report_structure() {
        let (mut profiler, clock, sink) = fake_profiler();
        profiler.checkpoint("start");
        clock.advance(Duration::from_millis(5));
        profiler.checkpoint_in("q1", "db");
        profiler.checkpoint_in("q2", "db");
        profiler.trace("boot");
        profiler.set_log_output(true);

        let report = profiler.report(false);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "<!--");
        assert_eq!(lines[1], "This is profiler usage report:");
        assert_eq!(*lines.last().unwrap(), "-->");
        assert_eq!(lines.iter().filter(|l| **l == "DEFAULT").count(), 1);
        assert_eq!(lines.iter().filter(|l| **l == "db").count(), 1);
        assert_eq!(lines.iter().filter(|l| l.starts_with("TOTAL RUNTIME: ")).count(), 1);
        assert_eq!(lines.iter().filter(|l| **l == "TRACES").count(), 1);
        assert!(report.contains("TRACE: boot\nsrc/handler.rs:10 <app::handler>"));

        assert_eq!(sink.lines(), vec![" *** TOTAL RUNTIME: 0.005000 *** "]);
    }

    #[test]
    fn test_report_without_traces_has_no_trace_section() {
        let (mut profiler, _, _) = fake_profiler();
        profiler.checkpoint("only");
        assert!(!profiler.report(false).contains("TRACES"));
    }

    #[test]
    fn test_report_print_returns_text() {
        let (mut profiler, _, _) = fake_profiler();
        profiler.checkpoint("printed");
        let report = profiler.report(true);
        assert!(report.contains("printed"));
    }

    #[test]
    fn test_snapshot() {
        let (mut profiler, clock, _) = fake_profiler();
        profiler.checkpoint("a");
        clock.advance(Duration::from_millis(500));
        profiler.checkpoint_in("b", "g");
        profiler.trace("t");

        let snapshot = profiler.snapshot();
        assert!(snapshot.enabled);
        assert_eq!(snapshot.total_secs, 0.5);
        assert_eq!(snapshot.groups.len(), 2);
        assert_eq!(snapshot.traces.len(), 1);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["groups"][1]["label"], "g");
        assert_eq!(json["groups"][1]["checkpoints"][0]["elapsed_since_last"], 0.5);
    }

    #[test]
    fn test_apply_config() {
        let (mut profiler, _, _) = fake_profiler();
        profiler.apply_config(&ProfilerConfig {
            enabled: false,
            log_output: true,
            memory_limit_mb: 0,
        });
        assert!(!profiler.is_enabled());
        assert!(profiler.is_log_enabled());
    }

    #[test]
    fn test_apply_config_keeps_memory_sampler() {
        let (mut profiler, _, _) = fake_profiler();
        profiler.apply_config(&ProfilerConfig {
            enabled: true,
            log_output: false,
            memory_limit_mb: 512,
        });
        profiler.checkpoint("x");

        let cp = &profiler.group("").unwrap().checkpoints[0];
        assert_eq!(cp.memory_used_mb, 32.0);
        assert_eq!(cp.memory_limit_mb, 128);
    }

    #[test]
    fn test_apply_config_sets_monitor_limit() {
        let mut profiler = Profiler::new();
        profiler.apply_config(&ProfilerConfig {
            enabled: true,
            log_output: false,
            memory_limit_mb: 4096,
        });
        profiler.checkpoint("x");

        let cp = &profiler.group("").unwrap().checkpoints[0];
        assert_eq!(cp.memory_limit_mb, 4096);
    }

    #[test]
    fn test_empty_capture_records_nothing() {
        let (profiler, _, sink) = fake_profiler();
        let mut profiler = profiler.with_stack_capture(FixedCapture(Vec::new()));
        profiler.set_request_context(None);
        profiler.checkpoint("a");
        profiler.set_log_output(true);

        profiler.trace("empty");

        assert!(profiler.traces().is_empty());
        assert!(sink.lines().is_empty());
        assert!(!profiler.report(false).contains("TRACES"));
    }
}
