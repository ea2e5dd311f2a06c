//! Report Assembly
//!
//! Builds the full text report: one bordered table per checkpoint
//! group, the total runtime, and the recorded traces, wrapped in an
//! HTML comment so it can be appended to generated pages.

use crate::profiler::checkpoint::format_secs;
use crate::profiler::events::EventLog;
use crate::profiler::trace::{format_frame, TraceLog};

use super::table::{render, Row};

/// First line of every report.
pub const REPORT_OPEN: &str = "<!--";

/// Last line of every report.
pub const REPORT_CLOSE: &str = "-->";

/// Introductory sentence following the opening marker.
pub const REPORT_HEADING: &str = "This is profiler usage report:";

/// Label of the total runtime line.
pub const TOTAL_RUNTIME_PREFIX: &str = "TOTAL RUNTIME: ";

/// Formats the total runtime line for a log.
pub fn total_runtime_line(events: &EventLog) -> String {
    format!("{}{}", TOTAL_RUNTIME_PREFIX, format_secs(events.total()))
}

/// Assembles the report text from the recorded state.
pub fn compose(events: &EventLog, traces: &TraceLog) -> String {
    let mut lines = vec![
        REPORT_OPEN.to_string(),
        REPORT_HEADING.to_string(),
        String::new(),
    ];

    for group in events.groups() {
        let rows: Vec<Row> = group.checkpoints.iter().map(|cp| cp.to_row()).collect();
        lines.push(render(&rows, group.title(), true));
    }

    lines.push(total_runtime_line(events));

    if !traces.is_empty() {
        lines.push("TRACES".to_string());
        for trace in traces.traces() {
            lines.push(format!("TRACE: {}", trace.label));
            lines.extend(trace.entries.iter().map(format_frame));
            lines.push(format!("END TRACE: {}", trace.label));
        }
    }

    lines.push(REPORT_CLOSE.to_string());
    lines.join("\n")
}
