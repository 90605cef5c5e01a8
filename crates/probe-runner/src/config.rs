//! Runner configuration
//!
//! [`RunnerConfig`] is the serializable, file-backed part of a run. The
//! callbacks and sanitizers live on [`crate::RunnerOptions`], which is built
//! from it.

use crate::error::ConfigError;
use crate::runner::RunnerOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Run configuration, loadable from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// API root; the endpoint path is appended to it
    pub base_url: String,
    /// HTTP method
    pub method: String,
    /// Requests per second; 0 disables pacing
    pub rate_limit: f64,
    /// Attempts per scenario before it is given up
    pub max_trials: usize,
    /// Times the pending set is re-run
    pub passes: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Extra static request headers
    pub headers: BTreeMap<String, String>,
}

impl RunnerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file; absent keys keep their defaults
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or a
    /// value is out of range
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for a negative or non-finite
    /// rate limit, a positive rate whose interval overflows [`Duration`], or
    /// zero `max_trials`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rate_limit.is_finite() || self.rate_limit < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit",
                reason: format!("must be a non-negative number, got {}", self.rate_limit),
            });
        }
        if self.rate_limit > 0.0 && Duration::try_from_secs_f64(1.0 / self.rate_limit).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit",
                reason: format!("{} requests per second is too slow to pace", self.rate_limit),
            });
        }
        if self.max_trials == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_trials",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: f64) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_trials(mut self, max_trials: usize) -> Self {
        self.max_trials = max_trials;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_passes(mut self, passes: usize) -> Self {
        self.passes = passes;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Add one static header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `base_url` joined with `path`, without doubling the slash
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Runner options for `path`, authenticated with a bearer `api_key`
    ///
    /// Sends `Content-Type: application/json` and `Authorization`, then any
    /// configured static headers.
    #[must_use]
    pub fn runner_options(&self, path: &str, api_key: &str) -> RunnerOptions {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Authorization".to_string(), format!("Bearer {api_key}"));
        headers.extend(self.headers.clone());

        RunnerOptions::new(self.endpoint(path))
            .with_method(self.method.clone())
            .with_headers(headers)
            .with_rate_limit(self.rate_limit)
            .with_max_trials(self.max_trials)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            method: "POST".to_string(),
            rate_limit: 0.3,
            max_trials: 3,
            passes: 5,
            timeout_secs: 600,
            headers: BTreeMap::new(),
        }
    }
}
