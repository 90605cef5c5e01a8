//! Probe CLI
//!
//! The `probe` binary: create scenarios for an API, run them against the
//! endpoint, print a CSV report, or compare two runs.
//!
//! ```text
//! probe create-scenarios --api embeddings --output-file scenarios.json
//! probe run-scenarios --api embeddings --scenarios-file scenarios.json --results-file results.json.gz
//! probe report --results-file results.json.gz
//! probe compare --left a.json.gz --right b.json.gz --api embeddings --verbose
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod commands;
pub mod logging;
pub mod shutdown;

/// Environment variable holding the bearer token for `run-scenarios`
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
