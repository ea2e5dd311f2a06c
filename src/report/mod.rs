//! Report Rendering Module
//!
//! Turns the recorded checkpoints and traces into text.
//!
//! # Structure
//!
//! - [`table`]: Aligned ASCII tables from key/value rows
//! - [`composer`]: The complete `<!-- ... -->` report

pub mod composer;
pub mod table;

pub use composer::compose;
pub use table::{render, Row};
