//! Pipeline entry points for index operations.
//!
//! - `build`: walk the feed and populate the month index (full or
//!   resumed from a checkpoint)
//! - `query`: the read path, with opportunistic self-healing

pub mod build;
pub mod query;

pub use build::{BuildMode, BuildReport, IndexBuilder, ScanState};
pub use query::MonthQuery;
