//! Clock and Memory Sampling Module
//!
//! Provides the host readings every checkpoint is built from.
//!
//! # Components
//!
//! - [`Clock`]: Monotonic timestamps ([`SystemClock`], [`ManualClock`])
//! - [`MemorySampler`]: Process memory usage ([`ResourceMonitor`], [`FixedMemory`])

pub mod clock;
pub mod resource;

pub use clock::{Clock, ManualClock, SystemClock};
pub use resource::{FixedMemory, MemorySample, MemorySampler, ResourceMonitor};
