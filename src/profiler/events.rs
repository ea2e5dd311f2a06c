//! Grouped Event Log
//!
//! Append-only storage for checkpoints. Elapsed times are measured
//! against a single cursor shared by every group: the delta of a
//! checkpoint is the time since the last checkpoint recorded in *any*
//! group, not in its own.

use std::time::Duration;

use crate::monitoring::MemorySample;

use super::checkpoint::{Checkpoint, Group};

/// Ordered groups of checkpoints plus the shared timing state.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    groups: Vec<Group>,
    cursor: Option<Duration>,
    total: Duration,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a checkpoint taken at `now` into `group`.
    ///
    /// The first checkpoint after creation or [`clear`](Self::clear)
    /// has a zero delta.
    pub fn record(
        &mut self,
        name: &str,
        group: &str,
        now: Duration,
        memory: MemorySample,
    ) -> &Checkpoint {
        let elapsed = match self.cursor {
            Some(previous) => now.saturating_sub(previous),
            None => Duration::ZERO,
        };
        self.total += elapsed;

        let checkpoint = Checkpoint::new(name, elapsed, self.total, memory);
        self.cursor = Some(now);

        let index = match self.groups.iter().position(|g| g.label == group) {
            Some(index) => index,
            None => {
                self.groups.push(Group::new(group));
                self.groups.len() - 1
            }
        };
        let checkpoints = &mut self.groups[index].checkpoints;
        checkpoints.push(checkpoint);
        &checkpoints[checkpoints.len() - 1]
    }

    /// Returns all groups in order of first use.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Looks up a group by label.
    pub fn group(&self, label: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.label == label)
    }

    /// Returns the running total of all deltas.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Returns the timestamp of the last recorded checkpoint.
    pub fn cursor(&self) -> Option<Duration> {
        self.cursor
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of checkpoints across groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    /// Drops every group and resets the timing state.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.cursor = None;
        self.total = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_MEMORY: MemorySample = MemorySample {
        used_mb: 0.0,
        limit_mb: 0,
    };

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_checkpoint_has_zero_delta() {
        let mut log = EventLog::new();
        let cp = log.record("start", "", ms(500), NO_MEMORY);

        assert_eq!(cp.elapsed_since_last, Duration::ZERO);
        assert_eq!(cp.cumulative_elapsed, Duration::ZERO);
        assert_eq!(log.cursor(), Some(ms(500)));
    }

    #[test]
    fn test_first_checkpoint_at_clock_origin() {
        let mut log = EventLog::new();
        log.record("a", "", Duration::ZERO, NO_MEMORY);
        let cp = log.record("b", "", ms(10), NO_MEMORY);

        assert_eq!(cp.elapsed_since_last, ms(10));
    }

    #[test]
    fn test_cumulative_is_prefix_sum() {
        let mut log = EventLog::new();
        let stamps = [100, 110, 135, 200, 201];
        for (i, t) in stamps.iter().enumerate() {
            log.record(&format!("p{}", i), "", ms(*t), NO_MEMORY);
        }

        let group = log.group("").unwrap();
        let mut sum = Duration::ZERO;
        for cp in &group.checkpoints {
            sum += cp.elapsed_since_last;
            assert_eq!(cp.cumulative_elapsed, sum);
        }
        assert_eq!(log.total(), ms(101));
    }

    #[test]
    fn test_cursor_is_shared_across_groups() {
        let mut log = EventLog::new();
        log.record("a1", "alpha", ms(0), NO_MEMORY);
        log.record("b1", "beta", ms(40), NO_MEMORY);
        log.record("a2", "alpha", ms(50), NO_MEMORY);

        let alpha = log.group("alpha").unwrap();
        // a2 is measured from b1, not from a1
        assert_eq!(alpha.checkpoints[1].elapsed_since_last, ms(10));
        assert_eq!(alpha.checkpoints[1].cumulative_elapsed, ms(50));

        let beta = log.group("beta").unwrap();
        assert_eq!(beta.checkpoints[0].elapsed_since_last, ms(40));
    }

    #[test]
    fn test_groups_keep_first_use_order() {
        let mut log = EventLog::new();
        log.record("x", "second", ms(0), NO_MEMORY);
        log.record("y", "", ms(1), NO_MEMORY);
        log.record("z", "second", ms(2), NO_MEMORY);
        log.record("w", "third", ms(3), NO_MEMORY);

        let labels: Vec<&str> = log.groups().iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["second", "", "third"]);
        assert_eq!(log.group("second").unwrap().len(), 2);
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_empty_name_is_kept() {
        let mut log = EventLog::new();
        log.record("", "", ms(0), NO_MEMORY);
        assert_eq!(log.group("").unwrap().checkpoints[0].name, "");
    }

    #[test]
    fn test_clear_restarts_timing() {
        let mut log = EventLog::new();
        log.record("a", "", ms(0), NO_MEMORY);
        log.record("b", "g", ms(30), NO_MEMORY);
        log.clear();

        assert!(log.is_empty());
        assert_eq!(log.total(), Duration::ZERO);
        assert_eq!(log.cursor(), None);

        let cp = log.record("c", "", ms(90), NO_MEMORY);
        assert_eq!(cp.elapsed_since_last, Duration::ZERO);
        assert_eq!(cp.cumulative_elapsed, Duration::ZERO);
    }

    #[test]
    fn test_clock_going_backwards_saturates() {
        let mut log = EventLog::new();
        log.record("a", "", ms(50), NO_MEMORY);
        let cp = log.record("b", "", ms(20), NO_MEMORY);
        assert_eq!(cp.elapsed_since_last, Duration::ZERO);
    }
}
