//! Output module for reporting indexing results
//!
//! This module turns stored site jobs into the summaries printed by the
//! command-line interface.

pub mod stats;

pub use stats::{load_statistics, print_statistics, IndexStatistics};
