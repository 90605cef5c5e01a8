//! Probe Runner
//!
//! Rate-limited, strictly sequential execution of scenarios against a JSON
//! HTTP endpoint, with incremental persistence so an interrupted run resumes
//! where it stopped.
//!
//! # Core Concepts
//!
//! - [`ScenarioRunner`]: owns the results map and drives pending results
//! - [`Transport`]: the network seam; [`ReqwestTransport`] in production
//! - [`classify`]: maps a reply to a terminal response, a retryable error,
//!   or genuine throttling
//! - [`CancellationToken`]: cooperative shutdown with a final flush
//! - [`RunnerConfig`]: TOML-loadable settings
//!
//! # Example
//!
//! ```rust,ignore
//! let config = RunnerConfig::from_file(path)?;
//! let transport = Arc::new(ReqwestTransport::new(config.timeout())?);
//! let store = Arc::new(ResultsFile::new("results.json.gz"));
//!
//! let mut runner = ScenarioRunner::new(results, transport, config.runner_options("embeddings", &key))
//!     .with_checkpoint(store.clone())
//!     .with_finalizer(store);
//! let summary = runner.run_passes(config.passes, &token).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cancel;
mod config;
mod error;
mod runner;
mod transport;

pub mod classify;
pub mod sse;

pub use cancel::CancellationToken;
pub use classify::{classify, Verdict};
pub use config::{RunnerConfig, DEFAULT_BASE_URL};
pub use error::{ConfigError, RunnerError, TransportError};
pub use runner::{
    BodySanitizer, Checkpoint, ErrorFn, HeaderSanitizer, ProgressFn, RunOutcome, RunSummary,
    RunnerOptions, ScenarioRunner,
};
pub use transport::{Reply, Request, ReqwestTransport, Transport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
