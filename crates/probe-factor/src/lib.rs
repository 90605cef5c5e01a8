//! Probe Factors
//!
//! Named, content-addressed test values and the combinatorial machinery that
//! turns catalogs of them into test cases.
//!
//! # Core Concepts
//!
//! - [`FactorKind`]: closed enum of catalog values for one request parameter
//! - [`Factor`]: type-erased factor with a stable [`FactorKey`]
//! - [`FactorSet`]: one test case, keyed independently of member order
//! - [`TestSuite`]: composable collection of sets (extend, merge, product)
//! - [`FactorRegistry`]: per-kind buckets and the negative, sanity and
//!   n-wise coverage suites
//!
//! # Example
//!
//! ```rust,ignore
//! use probe_factor::FactorRegistry;
//!
//! let mut registry = FactorRegistry::new();
//! registry.register_kind::<Temperature>().register_kind::<TopP>();
//!
//! let pairwise = registry.combination_suite("pairwise", 2)?;
//! let negative = registry.negative_suite("negative");
//! let all = pairwise.merge(&negative);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod factor;
mod key;
mod registry;
mod set;
mod suite;

pub use factor::{append_field, set_field, Factor, FactorKind, FactorSnapshot, Payload};
pub use key::{FactorKey, KeyError};
pub use registry::{FactorRegistry, RegistryError};
pub use set::{FactorSet, FactorSetSnapshot};
pub use suite::TestSuite;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
