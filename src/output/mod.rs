//! Output module for run summaries
//!
//! The collected data itself is written by [`crate::storage`]; this module
//! only reports on the run.

pub mod stats;

pub use stats::{print_statistics, CitySummary, RunStatistics};
