#![crate_name = "tlcompare"]
//! # Precision-aware comparison of transmission-loss data files
//!
//! `tlcompare` compares two ASCII files of numerical tabular transmission-loss
//! (TL) data. It parses each token, records the printed decimal precision,
//! and applies a six-level classification cascade to every value pair,
//! emitting per-line rows, aggregate statistics, and a pass/warn/fail
//! verdict. To use it without the CLI, the entry points are
//! [`compare_paths`] and [`compare_strings`].
#![warn(missing_docs)]
#![warn(unused_qualifications)]
#![deny(deprecated)]

pub mod accumulation;
pub mod classify;
mod driver;
pub mod error;
pub mod format;
pub mod line;
pub mod metrics;
pub mod precision;
pub mod report;
pub mod thresholds;
mod unit_mismatch;

pub use crate::driver::{compare_paths, compare_strings};
pub use crate::error::Error;
pub use crate::report::{Reporter, Summary, TracingReporter};
pub use crate::thresholds::Thresholds;

use schemars::schema_for;

/// Create the JSON schema for [`Thresholds`], the configuration surface a
/// caller serializes to drive a comparison.
pub fn get_schema() -> String {
    let schema = schema_for!(Thresholds);
    serde_json::to_string_pretty(&schema).unwrap()
}
