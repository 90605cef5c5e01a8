//! Probe APIs
//!
//! Concrete factor catalogs for the supported endpoints, the suites built from
//! them, and the sanitizers applied to recorded responses.
//!
//! # Core Concepts
//!
//! - [`Api`]: a supported endpoint, parsed from its command-line identifier
//! - seed registry: parameters every request needs (model, messages or input)
//! - main registry: optional parameters, the subject of negative, sanity and
//!   pairwise coverage
//! - [`sanitize`]: redaction of identifiers before results are persisted
//!
//! # Example
//!
//! ```
//! use probe_apis::Api;
//!
//! let api: Api = "embeddings".parse().unwrap();
//! assert_eq!(api.path(), "/embeddings");
//! let scenarios = api.scenarios().unwrap();
//! assert!(!scenarios.is_empty());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use probe_factor::RegistryError;
use probe_scenario::Scenario;
use probe_runner::{BodySanitizer, HeaderSanitizer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Declare a closed factor kind that writes one top-level field
///
/// Each variant lists its `(negative, primary)` flags and the JSON value it
/// sets. Names render as `field=value`.
macro_rules! field_kind {
    (
        $(#[$meta:meta])*
        $kind:ident = $field:literal {
            $( $variant:ident ($neg:literal, $pri:literal) => $value:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $kind {
            $( $variant ),+
        }

        impl $kind {
            /// Value written into the payload
            #[must_use]
            pub fn value(&self) -> ::serde_json::Value {
                match self {
                    $( Self::$variant => $value ),+
                }
            }
        }

        impl ::probe_factor::FactorKind for $kind {
            const KIND: &'static str = $field;

            fn variants() -> &'static [Self] {
                &[$( Self::$variant ),+]
            }

            fn name(&self) -> String {
                format!("{}={}", $field, $crate::render(&self.value()))
            }

            fn is_negative(&self) -> bool {
                match self {
                    $( Self::$variant => $neg ),+
                }
            }

            fn is_primary(&self) -> bool {
                match self {
                    $( Self::$variant => $pri ),+
                }
            }

            fn apply(&self, target: &mut ::probe_factor::Payload) {
                ::probe_factor::set_field(target, $field, self.value());
            }
        }
    };
}

pub mod chat_completions;
pub mod embeddings;
pub mod sanitize;

/// Errors raised while selecting or composing an API catalog
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("unknown api '{0}', expected one of: chatcompletions, embeddings")]
    Unknown(String),

    #[error("suite composition failed: {0}")]
    Registry(#[from] RegistryError),
}

/// A supported endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Api {
    ChatCompletions,
    Embeddings,
}

impl Api {
    /// Every supported API
    pub const ALL: [Api; 2] = [Api::ChatCompletions, Api::Embeddings];

    /// Command-line identifier
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Api::ChatCompletions => "chatcompletions",
            Api::Embeddings => "embeddings",
        }
    }

    /// Endpoint path, relative to the API root
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Api::ChatCompletions => "/chat/completions",
            Api::Embeddings => "/embeddings",
        }
    }

    /// Materialize every scenario of this API's catalog
    ///
    /// # Errors
    /// Returns [`ApiError::Registry`] if a combination suite cannot be built
    pub fn scenarios(self) -> Result<Vec<Scenario>, ApiError> {
        match self {
            Api::ChatCompletions => chat_completions::scenarios(),
            Api::Embeddings => embeddings::scenarios(),
        }
    }

    /// Response header sanitizer; shared by every API
    #[must_use]
    pub fn header_sanitizer(self) -> HeaderSanitizer {
        Arc::new(sanitize::response_headers)
    }

    /// Response body sanitizer for this API
    #[must_use]
    pub fn body_sanitizer(self) -> BodySanitizer {
        match self {
            Api::ChatCompletions => Arc::new(sanitize::chat_completion_body),
            Api::Embeddings => Arc::new(sanitize::embeddings_body),
        }
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Api {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Api::ALL
            .into_iter()
            .find(|api| api.id() == s)
            .ok_or_else(|| ApiError::Unknown(s.to_string()))
    }
}

/// Display form of a JSON value inside a factor name
///
/// Strings render bare; everything else renders as compact JSON, so a blank
/// string, an empty array and an array holding a blank string stay distinct.
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_ids_round_trip() {
        for api in Api::ALL {
            assert_eq!(api.id().parse::<Api>().unwrap(), api);
            assert_eq!(api.to_string(), api.id());
        }
    }

    #[test]
    fn unknown_api_is_rejected() {
        let err = "completions".parse::<Api>().unwrap_err();
        assert!(matches!(err, ApiError::Unknown(ref s) if s == "completions"));
        assert!(err.to_string().contains("chatcompletions"));
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(Api::ChatCompletions.path(), "/chat/completions");
        assert_eq!(Api::Embeddings.path(), "/embeddings");
    }

    #[test]
    fn render_keeps_blank_values_apart() {
        assert_eq!(render(&json!("hello")), "hello");
        assert_eq!(render(&json!(1_000_000_000)), "1000000000");
        assert_eq!(render(&json!(null)), "null");
        assert_eq!(render(&json!(["foo", "bar"])), r#"["foo","bar"]"#);
        assert_eq!(render(&json!({"12345": -100})), r#"{"12345":-100}"#);

        let blanks = [render(&json!("")), render(&json!([])), render(&json!([""]))];
        assert_eq!(blanks, ["", "[]", r#"[""]"#]);
    }
}
