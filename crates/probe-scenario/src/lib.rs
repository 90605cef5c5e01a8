//! Probe Scenarios
//!
//! Materialized test cases and their persisted execution state.
//!
//! # Core Concepts
//!
//! - [`Scenario`]: a factor set snapshot plus the payload it produces
//! - [`ScenarioResult`]: pending, errored or settled state of one scenario
//! - [`store`]: plain JSON scenario files and gzip-compressed result files
//! - [`report`]: CSV rendering of a results map
//! - [`compare`]: diffing two results maps by status, content type and body
//!   structure

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod result;
mod scenario;

pub mod compare;
pub mod report;
pub mod store;

pub use compare::{CompareError, CompareMethod, ComparisonReport, Diff};
pub use report::csv_report;
pub use result::{pending_count, seed_results, ErrorEntry, Response, ResultMap, ScenarioResult, NO_STATUS};
pub use scenario::{create_scenarios, group_counts, scenario_map, Scenario, ScenarioMap};
pub use store::{ResultsFile, StoreError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
