//! Sequential, resumable scenario execution
//!
//! [`ScenarioRunner`] owns the results map and drives every pending result
//! through one attempt at a time:
//!
//! 1. Send the scenario's request body through the [`Transport`]
//! 2. [`classify`] the reply (or record a transport failure)
//! 3. Sanitize the captured headers and body
//! 4. Report progress and persist a checkpoint
//! 5. Stop if throttled or cancelled, otherwise pace and continue
//!
//! Retryable failures are recorded on the result and reported through the
//! error callback; only persistence failures surface as `Err`.

use crate::cancel::CancellationToken;
use crate::classify::{classify, Verdict};
use crate::error::RunnerError;
use crate::transport::{Request, Transport};
use probe_factor::FactorKey;
use probe_scenario::{pending_count, ErrorEntry, ResultMap, ResultsFile, StoreError, NO_STATUS};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Called after each attempt with `(completed, total)`
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;
/// Called with the error object and the scenario key
pub type ErrorFn = Arc<dyn Fn(&Value, &FactorKey) + Send + Sync>;
/// Mutates captured response headers in place
pub type HeaderSanitizer = Arc<dyn Fn(&mut BTreeMap<String, String>) + Send + Sync>;
/// Mutates a captured response body in place
pub type BodySanitizer = Arc<dyn Fn(&mut Value) + Send + Sync>;

/// Persists the whole results map
pub trait Checkpoint: Send + Sync {
    /// # Errors
    /// Returns [`StoreError`] if the results cannot be written
    fn persist(&self, results: &ResultMap) -> Result<(), StoreError>;
}

impl Checkpoint for ResultsFile {
    fn persist(&self, results: &ResultMap) -> Result<(), StoreError> {
        self.save(results)
    }
}

/// Request target, pacing and hooks
#[derive(Clone)]
pub struct RunnerOptions {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    /// Requests per second; 0 disables pacing
    pub rate_limit: f64,
    pub max_trials: usize,
    on_progress: ProgressFn,
    on_error: ErrorFn,
    header_sanitizer: HeaderSanitizer,
    body_sanitizer: BodySanitizer,
}

impl RunnerOptions {
    /// POST to `url` with a JSON content type, no pacing, 3 trials and
    /// logging callbacks
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            url: url.into(),
            method: "POST".to_string(),
            headers,
            rate_limit: 0.0,
            max_trials: 3,
            on_progress: Arc::new(|completed, total| {
                info!(completed, total, "completed {completed} of {total} scenarios");
            }),
            on_error: Arc::new(|error, key| {
                warn!(scenario = %key, %error, "error in scenario");
            }),
            header_sanitizer: Arc::new(|_| {}),
            body_sanitizer: Arc::new(|_| {}),
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Replace all request headers
    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: f64) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    #[must_use]
    pub fn with_max_trials(mut self, max_trials: usize) -> Self {
        self.max_trials = max_trials;
        self
    }

    #[must_use]
    pub fn on_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Arc::new(f);
        self
    }

    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&Value, &FactorKey) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(f);
        self
    }

    #[must_use]
    pub fn with_header_sanitizer(mut self, f: HeaderSanitizer) -> Self {
        self.header_sanitizer = f;
        self
    }

    #[must_use]
    pub fn with_body_sanitizer(mut self, f: BodySanitizer) -> Self {
        self.body_sanitizer = f;
        self
    }

    /// Pause between attempts
    ///
    /// Zero when pacing is off. Saturates at [`Duration::MAX`] for rates too
    /// small to express as an interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        if self.rate_limit > 0.0 && self.rate_limit.is_finite() {
            Duration::try_from_secs_f64(1.0 / self.rate_limit).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}

impl fmt::Debug for RunnerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerOptions")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("rate_limit", &self.rate_limit)
            .field("max_trials", &self.max_trials)
            .finish_non_exhaustive()
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every pending result was attempted
    Completed,
    /// Upstream quota exhausted; the runner will not continue
    Halted,
    /// Cancellation token fired; results were flushed
    Cancelled,
}

/// Summary of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Attempts made in this run
    pub attempts: usize,
    /// Results still pending afterwards
    pub pending: usize,
}

/// Drives pending results against one endpoint
pub struct ScenarioRunner {
    results: ResultMap,
    options: RunnerOptions,
    transport: Arc<dyn Transport>,
    checkpoint: Option<Arc<dyn Checkpoint>>,
    finalizer: Option<Arc<dyn Checkpoint>>,
    halted: bool,
}

impl ScenarioRunner {
    #[must_use]
    pub fn new(results: ResultMap, transport: Arc<dyn Transport>, options: RunnerOptions) -> Self {
        Self {
            results,
            options,
            transport,
            checkpoint: None,
            finalizer: None,
            halted: false,
        }
    }

    /// Persist after every attempt
    #[must_use]
    pub fn with_checkpoint(mut self, checkpoint: Arc<dyn Checkpoint>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// Flush on cancellation
    #[must_use]
    pub fn with_finalizer(mut self, finalizer: Arc<dyn Checkpoint>) -> Self {
        self.finalizer = Some(finalizer);
        self
    }

    #[inline]
    #[must_use]
    pub fn results(&self) -> &ResultMap {
        &self.results
    }

    #[must_use]
    pub fn into_results(self) -> ResultMap {
        self.results
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Genuine throttling was seen; never cleared
    #[inline]
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Results still eligible for an attempt
    #[must_use]
    pub fn pending(&self) -> usize {
        pending_count(&self.results, self.options.max_trials)
    }

    fn summary(&self, outcome: RunOutcome, attempts: usize) -> RunSummary {
        RunSummary {
            outcome,
            attempts,
            pending: self.pending(),
        }
    }

    fn persist(&self) -> Result<(), RunnerError> {
        if let Some(checkpoint) = &self.checkpoint {
            checkpoint.persist(&self.results)?;
        }
        Ok(())
    }

    fn cancelled(&self, attempts: usize) -> Result<RunSummary, RunnerError> {
        info!(attempts, "run cancelled, flushing results");
        if let Some(finalizer) = &self.finalizer {
            finalizer.persist(&self.results)?;
        }
        Ok(self.summary(RunOutcome::Cancelled, attempts))
    }

    /// Attempt every currently pending result once, in key order
    ///
    /// # Errors
    /// Returns [`RunnerError`] if a checkpoint or the cancellation flush fails
    pub async fn run(&mut self, token: &CancellationToken) -> Result<RunSummary, RunnerError> {
        if self.halted {
            return Ok(self.summary(RunOutcome::Halted, 0));
        }

        let interval = self.options.interval();
        let max_trials = self.options.max_trials;
        let queue: Vec<FactorKey> = self
            .results
            .iter()
            .filter(|(_, r)| r.is_pending(max_trials))
            .map(|(k, _)| *k)
            .collect();
        let total = self.results.len();
        let mut completed = total - queue.len();
        info!(pending = queue.len(), total, ?interval, "starting run");

        let mut attempts = 0;
        for (i, key) in queue.iter().enumerate() {
            if token.is_cancelled() {
                return self.cancelled(attempts);
            }

            self.attempt(key).await?;
            attempts += 1;
            completed += 1;
            (self.options.on_progress)(completed, total);
            self.persist()?;

            if self.halted {
                warn!(scenario = %key, "rate limit reached, stopping the runner");
                return Ok(self.summary(RunOutcome::Halted, attempts));
            }
            if token.is_cancelled() {
                return self.cancelled(attempts);
            }

            let last = i + 1 == queue.len();
            if !interval.is_zero() && !last {
                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    () = token.cancelled() => return self.cancelled(attempts),
                }
            }
        }

        Ok(self.summary(RunOutcome::Completed, attempts))
    }

    /// Repeat [`Self::run`] up to `passes` times
    ///
    /// Stops early when halted, cancelled, or nothing is pending.
    ///
    /// # Errors
    /// Propagates [`RunnerError`] from [`Self::run`]
    pub async fn run_passes(&mut self, passes: usize, token: &CancellationToken) -> Result<RunSummary, RunnerError> {
        let mut summary = self.summary(RunOutcome::Completed, 0);
        let mut attempts = 0;
        for pass in 1..=passes {
            if self.halted {
                info!("runner is halted, not starting another pass");
                summary.outcome = RunOutcome::Halted;
                break;
            }
            if self.pending() == 0 {
                info!("nothing pending");
                break;
            }
            info!(pass, passes, "starting pass");
            summary = self.run(token).await?;
            attempts += summary.attempts;
            if summary.outcome != RunOutcome::Completed {
                break;
            }
        }
        summary.attempts = attempts;
        Ok(summary)
    }

    async fn attempt(&mut self, key: &FactorKey) -> Result<(), RunnerError> {
        let Some(result) = self.results.get(key) else {
            return Ok(());
        };
        let request = Request {
            method: self.options.method.clone(),
            url: self.options.url.clone(),
            headers: self.options.headers.clone(),
            body: serde_json::to_vec(&result.scenario.request_body)?,
        };

        let verdict = match self.transport.send(request).await {
            Ok(reply) => {
                debug!(scenario = %key, status = reply.status, "reply received");
                classify(&reply)
            }
            Err(e) => Verdict::Retry(ErrorEntry::text(format!("Network/IO error: {e}"), NO_STATUS)),
        };

        let Some(result) = self.results.get_mut(key) else {
            return Ok(());
        };
        match verdict {
            Verdict::Settled(response) => {
                debug!(scenario = %key, status = response.status, "settled");
                result.response = Some(response);
            }
            Verdict::Retry(entry) => {
                (self.options.on_error)(&entry.message, key);
                result.errors.push(entry);
            }
            Verdict::Throttled => {
                (self.options.on_error)(&json!({ "message": "Rate limit reached" }), key);
                self.halted = true;
            }
        }

        match result.response.as_mut() {
            Some(response) => {
                let headers = response.headers.get_or_insert_with(BTreeMap::new);
                (self.options.header_sanitizer)(headers);
                let body = response.body.get_or_insert_with(|| json!({}));
                (self.options.body_sanitizer)(body);
            }
            None => {
                (self.options.header_sanitizer)(&mut BTreeMap::new());
                (self.options.body_sanitizer)(&mut json!({}));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("results", &self.results.len())
            .field("options", &self.options)
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_from_rate() {
        let options = RunnerOptions::new("http://x");
        assert_eq!(options.interval(), Duration::ZERO);
        assert_eq!(options.clone().with_rate_limit(2.0).interval(), Duration::from_millis(500));
        assert_eq!(options.with_rate_limit(-1.0).interval(), Duration::ZERO);
    }

    #[test]
    fn tiny_rate_saturates_instead_of_panicking() {
        let options = RunnerOptions::new("http://x").with_rate_limit(1e-300);
        assert_eq!(options.interval(), Duration::MAX);
        let options = RunnerOptions::new("http://x").with_rate_limit(f64::MIN_POSITIVE);
        assert_eq!(options.interval(), Duration::MAX);
    }

    #[test]
    fn default_headers_send_json() {
        let options = RunnerOptions::new("http://x");
        assert_eq!(options.method, "POST");
        assert_eq!(options.headers["Content-Type"], "application/json");
        assert_eq!(options.max_trials, 3);
    }

    #[test]
    fn debug_hides_header_values() {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer secret".to_string());
        let options = RunnerOptions::new("http://x").with_headers(headers);
        let text = format!("{options:?}");
        assert!(text.contains("Authorization"));
        assert!(!text.contains("secret"));
    }
}
