//! Checkpoint Records
//!
//! The immutable rows of the event log and the groups that hold them.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::monitoring::MemorySample;
use crate::report::table::Row;

/// One recorded timing and memory sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checkpoint {
    /// Caller supplied label, stored verbatim
    pub name: String,
    /// Time since the previous checkpoint in any group
    #[serde(serialize_with = "as_secs")]
    pub elapsed_since_last: Duration,
    /// Running total at the time of this checkpoint
    #[serde(serialize_with = "as_secs")]
    pub cumulative_elapsed: Duration,
    /// Memory in use, in megabytes
    pub memory_used_mb: f64,
    /// Memory ceiling in megabytes, 0 when unknown
    pub memory_limit_mb: u64,
    /// Usage as a whole-number percentage of the ceiling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_percent: Option<f64>,
}

impl Checkpoint {
    /// Builds a checkpoint from its timing values and a memory sample.
    pub fn new(
        name: impl Into<String>,
        elapsed_since_last: Duration,
        cumulative_elapsed: Duration,
        memory: MemorySample,
    ) -> Self {
        Self {
            name: name.into(),
            elapsed_since_last,
            cumulative_elapsed,
            memory_used_mb: memory.used_mb,
            memory_limit_mb: memory.limit_mb,
            memory_percent: memory.percent(),
        }
    }

    /// Converts the checkpoint into a report table row.
    pub fn to_row(&self) -> Row {
        let mut row = vec![
            ("name".to_string(), self.name.clone()),
            ("time".to_string(), format_secs(self.elapsed_since_last)),
            ("overall".to_string(), format_secs(self.cumulative_elapsed)),
            (
                "memory_usage".to_string(),
                format!("{:.2}", self.memory_used_mb),
            ),
            ("memory_limit".to_string(), self.memory_limit_mb.to_string()),
        ];
        if let Some(percent) = self.memory_percent {
            row.push(("memory_percent".to_string(), format!("{:.0}", percent)));
        }
        row
    }
}

/// A labelled, ordered run of checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Group {
    /// Group label; empty for the default group
    pub label: String,
    /// Checkpoints in call order
    pub checkpoints: Vec<Checkpoint>,
}

impl Group {
    /// Creates an empty group.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            checkpoints: Vec::new(),
        }
    }

    /// Title used when rendering the group.
    pub fn title(&self) -> &str {
        if self.label.is_empty() {
            "DEFAULT"
        } else {
            &self.label
        }
    }

    /// Number of checkpoints.
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Returns true if the group holds no checkpoints.
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

/// Formats a duration as seconds with microsecond precision.
pub fn format_secs(duration: Duration) -> String {
    format!("{:.6}", duration.as_secs_f64())
}

fn as_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}
