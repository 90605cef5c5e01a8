//! Execution results
//!
//! A [`ScenarioResult`] starts unexecuted, then either settles on a terminal
//! [`Response`] or accumulates [`ErrorEntry`] records until it runs out of
//! trials.

use crate::scenario::{Scenario, ScenarioMap};
use probe_factor::FactorKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Results keyed (and therefore sorted) by scenario key
pub type ResultMap = BTreeMap<FactorKey, ScenarioResult>;

/// Status code recorded for failures without an HTTP status
pub const NO_STATUS: i32 = -1;

/// One failed, retryable attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub message: Value,
    pub status_code: i32,
}

impl ErrorEntry {
    #[must_use]
    pub fn new(message: Value, status_code: i32) -> Self {
        Self { message, status_code }
    }

    /// Entry whose message is `{"message": text}`
    #[must_use]
    pub fn text(text: impl Into<String>, status_code: i32) -> Self {
        Self::new(serde_json::json!({ "message": text.into() }), status_code)
    }
}

/// Captured terminal response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<Value>,
}

impl Response {
    /// Header value by lower-cased name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref()?.get(name).map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Persisted execution state of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub key: FactorKey,
    pub scenario: Scenario,
    pub response: Option<Response>,
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

impl ScenarioResult {
    /// Unexecuted result for a scenario
    #[must_use]
    pub fn new(scenario: Scenario) -> Self {
        Self {
            key: scenario.key,
            scenario,
            response: None,
            errors: Vec::new(),
        }
    }

    /// No terminal response yet and trials left
    #[inline]
    #[must_use]
    pub fn is_pending(&self, max_trials: usize) -> bool {
        self.response.is_none() && self.errors.len() < max_trials
    }

    /// Never attempted
    #[inline]
    #[must_use]
    pub fn is_unexecuted(&self) -> bool {
        self.response.is_none() && self.errors.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn latest_error(&self) -> Option<&ErrorEntry> {
        self.errors.last()
    }
}

/// Add an unexecuted result for every scenario not yet in `results`
///
/// Existing entries are kept as they are. Returns the number added.
pub fn seed_results(results: &mut ResultMap, scenarios: &ScenarioMap) -> usize {
    let mut added = 0;
    for (key, scenario) in scenarios {
        if !results.contains_key(key) {
            results.insert(*key, ScenarioResult::new(scenario.clone()));
            added += 1;
        }
    }
    added
}

/// Number of results still pending
#[must_use]
pub fn pending_count(results: &ResultMap, max_trials: usize) -> usize {
    results.values().filter(|r| r.is_pending(max_trials)).count()
}
