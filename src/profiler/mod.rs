//! Checkpoint Profiler Module
//!
//! Records named timing/memory checkpoints and call-stack snapshots.
//!
//! # Structure
//!
//! - [`checkpoint`]: Checkpoint records and groups
//! - [`events`]: Grouped event log with the shared timing cursor
//! - [`trace`]: Stack capture and trace buckets
//! - [`state`]: The [`Profiler`] instance
//! - [`global`]: Process-wide profiler and free functions

pub mod checkpoint;
pub mod events;
pub mod global;
pub mod state;
pub mod trace;

pub use checkpoint::{Checkpoint, Group};
pub use events::EventLog;
pub use state::{ProfileSnapshot, Profiler};
pub use trace::{
    format_frame, BacktraceCapture, FixedCapture, StackCapture, Trace, TraceEntry, TraceLog,
};
