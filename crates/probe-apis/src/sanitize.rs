//! Response sanitizers
//!
//! Recorded responses are diffed across runs and checked into fixtures, so
//! per-request identifiers and timestamps are masked before persisting.

use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Response headers whose values are kept verbatim
pub const HEADER_ALLOW_LIST: &[&str] = &[
    "access-control-expose-headers",
    "alt-svc",
    "cf-cache-status",
    "connection",
    "content-encoding",
    "content-length",
    "content-type",
    "openai-processing-ms",
    "openai-version",
    "server",
    "strict-transport-security",
    "transfer-encoding",
    "x-content-type-options",
    "x-ratelimit-limit-requests",
    "x-ratelimit-limit-tokens",
    "x-ratelimit-remaining-requests",
    "x-ratelimit-remaining-tokens",
    "x-ratelimit-reset-requests",
    "x-ratelimit-reset-tokens",
];

/// Pinned `created` timestamp
pub const CREATED: i64 = 1_234_567_890;

/// Mask every character but the first and last
///
/// Strings shorter than 3 characters are returned unchanged.
#[must_use]
pub fn redact(text: &str) -> String {
    let count = text.chars().count();
    if count < 3 {
        return text.to_string();
    }
    text.chars()
        .enumerate()
        .map(|(i, c)| if i == 0 || i == count - 1 { c } else { '*' })
        .collect()
}

/// Redact the value of every header not on [`HEADER_ALLOW_LIST`]
pub fn response_headers(headers: &mut BTreeMap<String, String>) {
    for (name, value) in headers.iter_mut() {
        if !HEADER_ALLOW_LIST.contains(&name.to_ascii_lowercase().as_str()) {
            *value = redact(value);
        }
    }
}

fn redact_field(obj: &mut serde_json::Map<String, Value>, field: &str) {
    if let Some(Value::String(s)) = obj.get_mut(field) {
        *s = redact(s);
    }
}

/// Chat completion body, or every chunk and chunk choice of a streamed one
///
/// Objects get `id` and `system_fingerprint` redacted, `created` pinned to
/// [`CREATED`] and `service_tier` pinned to `"default"`.
pub fn chat_completion_body(body: &mut Value) {
    match body {
        Value::Object(obj) => {
            redact_field(obj, "id");
            redact_field(obj, "system_fingerprint");
            obj.insert("created".to_string(), json!(CREATED));
            obj.insert("service_tier".to_string(), json!("default"));
        }
        Value::Array(chunks) => {
            for chunk in chunks {
                chat_completion_body(chunk);
                if let Some(Value::Array(choices)) = chunk.get_mut("choices") {
                    for choice in choices {
                        chat_completion_body(choice);
                    }
                }
            }
        }
        _ => {}
    }
}

/// Embeddings responses carry no per-request identifiers
pub fn embeddings_body(_body: &mut Value) {}
