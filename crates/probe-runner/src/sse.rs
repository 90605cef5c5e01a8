//! Server-sent event stream decoding

use serde_json::Value;

/// Record that terminates a stream
pub const DONE_RECORD: &str = "data: [DONE]";

/// Event stream could not be decoded
#[derive(Debug, thiserror::Error)]
#[error("error parsing SSE data: {source}")]
pub struct SseError {
    #[from]
    source: serde_json::Error,
}

/// Decode a complete event stream into its JSON records, in order
///
/// Records are separated by a blank line. The `data: ` prefix is stripped
/// from every line; blank records and the `[DONE]` sentinel are skipped.
///
/// # Errors
/// Returns [`SseError`] if any remaining record is not valid JSON
pub fn decode_event_stream(text: &str) -> Result<Vec<Value>, SseError> {
    let mut out = Vec::new();
    for record in text.split("\n\n") {
        if record.is_empty() || record == DONE_RECORD {
            continue;
        }
        let payload = record
            .split('\n')
            .map(|line| line.strip_prefix("data: ").unwrap_or(line))
            .collect::<Vec<_>>()
            .join("\n");
        let payload = payload.trim();
        if payload.is_empty() {
            continue;
        }
        out.push(serde_json::from_str(payload)?);
    }
    Ok(out)
}
