//! Reply classification
//!
//! Turns one [`Reply`] into a [`Verdict`]: a terminal response, a retryable
//! error entry, or a signal that the upstream quota is exhausted.

use crate::sse::decode_event_stream;
use crate::transport::Reply;
use probe_scenario::{ErrorEntry, Response, NO_STATUS};
use serde_json::{json, Value};

/// Remaining-requests quota header
pub const REMAINING_REQUESTS: &str = "x-ratelimit-remaining-requests";
/// Remaining-tokens quota header
pub const REMAINING_TOKENS: &str = "x-ratelimit-remaining-tokens";

const TOO_MANY_REQUESTS: u16 = 429;

/// Outcome of one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Terminal: store the response, never retry
    Settled(Response),
    /// Retryable: record the entry against the result
    Retry(ErrorEntry),
    /// Quota exhausted: record nothing and halt the run
    Throttled,
}

/// Leading integer of a header value, after optional whitespace and sign
///
/// Returns `None` when no digits lead the value.
#[must_use]
pub fn parse_leading_int(value: &str) -> Option<i64> {
    let s = value.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // saturate on overflow; only zero matters to callers
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Quota counter reads as exhausted: absent or blank counts as zero,
/// unparsable does not
fn exhausted(reply: &Reply, header: &str) -> bool {
    match reply.header(header).map(str::trim) {
        None | Some("") => true,
        Some(value) => parse_leading_int(value) == Some(0),
    }
}

/// A 429 is genuine throttling when either quota counter is exhausted
#[must_use]
pub fn is_genuine_throttle(reply: &Reply) -> bool {
    exhausted(reply, REMAINING_REQUESTS) || exhausted(reply, REMAINING_TOKENS)
}

/// Body describing a non-2xx reply
#[must_use]
pub fn error_body(reply: &Reply) -> Value {
    let is_json = reply
        .content_type()
        .is_some_and(|ct| ct.contains("application/json"));
    if is_json {
        serde_json::from_str(&reply.body).unwrap_or_else(|_| {
            json!({
                "message": format!(
                    "Failed to parse JSON response for the error. Status code: {}, body: {}",
                    reply.status, reply.body
                )
            })
        })
    } else {
        json!({ "message": format!("HTTP error: {} - {}", reply.status, reply.body) })
    }
}

fn settled(reply: &Reply, body: Value) -> Verdict {
    Verdict::Settled(Response {
        status: reply.status,
        headers: Some(reply.headers.clone()),
        body: Some(body),
    })
}

/// Classify one reply
#[must_use]
pub fn classify(reply: &Reply) -> Verdict {
    let status = reply.status;

    if status == TOO_MANY_REQUESTS {
        if is_genuine_throttle(reply) {
            return Verdict::Throttled;
        }
        return Verdict::Retry(ErrorEntry::text(
            "Request rejected. Rate limit would've rejected for scenario.",
            i32::from(status),
        ));
    }

    if (400..500).contains(&status) {
        return settled(reply, error_body(reply));
    }

    if !(200..300).contains(&status) {
        return Verdict::Retry(ErrorEntry::new(error_body(reply), i32::from(status)));
    }

    let content_type = reply.content_type();
    match content_type {
        Some(ct) if ct.contains("text/event-stream") => match decode_event_stream(&reply.body) {
            Ok(records) => settled(reply, Value::Array(records)),
            Err(e) => Verdict::Retry(ErrorEntry::text(format!("Failed to parse SSE response: {e}"), NO_STATUS)),
        },
        Some(ct) if ct.contains("application/json") => match serde_json::from_str(&reply.body) {
            Ok(body) => settled(reply, body),
            Err(e) => Verdict::Retry(ErrorEntry::text(format!("Failed to parse JSON response: {e}"), NO_STATUS)),
        },
        _ => settled(
            reply,
            json!({
                "message": format!(
                    "Unexpected response content type: {}, body: {}",
                    content_type.unwrap_or("null"),
                    reply.body
                )
            }),
        ),
    }
}
