//! pointprof - Checkpoint Profiler
//!
//! A lightweight, process-wide instrumentation utility. Drop named
//! checkpoints into a program as it runs, optionally capture call
//! stacks, and get back a text report with one timing/memory table per
//! checkpoint group.
//!
//! # Architecture
//!
//! The library is organized into five modules:
//!
//! - [`monitoring`]: Clock and process memory sampling
//! - [`profiler`]: Event log, trace recorder and the process-wide instance
//! - [`report`]: ASCII tables and report assembly
//! - [`diagnostics`]: Line-oriented event mirroring to a log sink
//! - [`config`]: Environment driven switches
//!
//! # Example
//!
//! ```rust
//! use pointprof::profiler::global;
//!
//! global::checkpoint("start");
//! global::checkpoint_in("parse", "input");
//! global::checkpoint("end");
//!
//! let report = global::report(false);
//! assert!(report.contains("TOTAL RUNTIME"));
//! ```

pub mod config;
pub mod diagnostics;
pub mod monitoring;
pub mod profiler;
pub mod report;

// Re-export commonly used types
pub use config::{ConfigError, ProfilerConfig};
pub use profiler::global;
pub use profiler::{Checkpoint, Group, ProfileSnapshot, Profiler, Trace, TraceEntry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "pointprof";
