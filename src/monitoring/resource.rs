//! Memory Usage Sampling
//!
//! Reads the memory footprint of the current process so each
//! checkpoint can carry its usage next to the configured ceiling.

use sysinfo::{get_current_pid, Pid, ProcessRefreshKind, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A single memory usage sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySample {
    /// Memory in use, in megabytes rounded to 2 decimals
    pub used_mb: f64,
    /// Memory ceiling in megabytes (0 when unknown or unlimited)
    pub limit_mb: u64,
}

impl MemorySample {
    /// Returns usage as a whole-number percentage of the limit.
    ///
    /// `None` when either value is zero.
    pub fn percent(&self) -> Option<f64> {
        if self.used_mb == 0.0 || self.limit_mb == 0 {
            return None;
        }
        Some((self.used_mb / self.limit_mb as f64 * 100.0).round())
    }
}

/// A source of memory usage samples.
pub trait MemorySampler: Send {
    /// Takes a sample. Must not fail; unavailable values read as zero.
    fn sample(&mut self) -> MemorySample;

    /// Applies a configured memory ceiling in megabytes.
    ///
    /// Samplers that report their own ceiling ignore it.
    fn set_limit_mb(&mut self, _limit_mb: u64) {}
}

/// Samples the resident memory of the current process.
///
/// The reported ceiling is the configured limit, or the memory limit of
/// the host control group when no limit is configured.
///
/// # Example
///
/// ```rust,no_run
/// use pointprof::monitoring::{MemorySampler, ResourceMonitor};
///
/// let mut monitor = ResourceMonitor::new().with_limit_mb(512);
/// let sample = monitor.sample();
/// println!("{} MB of {} MB", sample.used_mb, sample.limit_mb);
/// ```
pub struct ResourceMonitor {
    system: System,
    process_id: Option<Pid>,
    limit_mb: u64,
    host_limit_mb: u64,
}

impl ResourceMonitor {
    /// Creates a monitor for the current process using the host ceiling.
    pub fn new() -> Self {
        let process_id = match get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                log::warn!("Memory sampling unavailable: {}", e);
                None
            }
        };

        let mut system = System::new();
        let host_limit_mb = host_limit_bytes(&mut system).map_or(0, bytes_to_whole_mb);
        if host_limit_mb > 0 {
            log::debug!("Host memory ceiling: {} MB", host_limit_mb);
        }

        Self {
            system,
            process_id,
            limit_mb: 0,
            host_limit_mb,
        }
    }

    /// Sets the memory ceiling reported alongside usage.
    ///
    /// `0` falls back to the host ceiling.
    pub fn with_limit_mb(mut self, limit_mb: u64) -> Self {
        self.limit_mb = limit_mb;
        self
    }

    /// Returns the ceiling reported with each sample.
    pub fn limit_mb(&self) -> u64 {
        effective_limit_mb(self.limit_mb, self.host_limit_mb)
    }

    /// Returns the ceiling detected for the host, 0 if none was found.
    pub fn host_limit_mb(&self) -> u64 {
        self.host_limit_mb
    }

    fn used_bytes(&mut self) -> u64 {
        let Some(pid) = self.process_id else {
            return 0;
        };

        let refresh_kind = ProcessRefreshKind::new().with_memory();
        if !self.system.refresh_process_specifics(pid, refresh_kind) {
            return 0;
        }

        self.system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResourceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceMonitor")
            .field("process_id", &self.process_id)
            .field("limit_mb", &self.limit_mb)
            .field("host_limit_mb", &self.host_limit_mb)
            .finish()
    }
}

impl MemorySampler for ResourceMonitor {
    fn sample(&mut self) -> MemorySample {
        MemorySample {
            used_mb: bytes_to_mb(self.used_bytes()),
            limit_mb: self.limit_mb(),
        }
    }

    fn set_limit_mb(&mut self, limit_mb: u64) {
        self.limit_mb = limit_mb;
    }
}

/// Returns the same sample every time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMemory(pub MemorySample);

impl FixedMemory {
    /// Creates a sampler reporting `used_mb` of `limit_mb`.
    pub fn new(used_mb: f64, limit_mb: u64) -> Self {
        Self(MemorySample { used_mb, limit_mb })
    }
}

impl MemorySampler for FixedMemory {
    fn sample(&mut self) -> MemorySample {
        self.0
    }
}

/// Reads the memory limit of the current control group.
///
/// `None` off Linux, or when the memory totals cannot be read.
fn host_limit_bytes(system: &mut System) -> Option<u64> {
    system.refresh_memory();
    if system.total_memory() == 0 {
        return None;
    }
    system
        .cgroup_limits()
        .map(|limits| limits.total_memory)
        .filter(|total| *total > 0)
}

/// Picks the configured limit, falling back to the host one.
fn effective_limit_mb(configured_mb: u64, host_mb: u64) -> u64 {
    if configured_mb > 0 {
        configured_mb
    } else {
        host_mb
    }
}

/// Converts bytes to megabytes rounded to 2 decimals.
fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

fn bytes_to_whole_mb(bytes: u64) -> u64 {
    bytes / (1024 * 1024)
}
