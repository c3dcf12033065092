use serde::Deserialize;
use serde_json::Value;

use super::event::{Status, StreamEvent};

/// Sentinel that marks a record as carrying an event payload
pub const DATA_PREFIX: &str = "data: ";

/// Wire shape of one event payload
#[derive(Debug, Deserialize)]
struct FramePayload {
    status: String,
    #[serde(default)]
    message: Value,
    #[serde(default)]
    progress: Value,
    #[serde(default)]
    answer: Value,
}

/// Extracts a single event from one `data: <json>` record
pub struct EventFrameParser;

impl EventFrameParser {
    /// Parse one record.
    ///
    /// Returns `None` for records that are not event frames (blank keep-alive
    /// lines, `event:` fields, comments, empty payloads). A frame whose payload
    /// cannot be decoded yields [`StreamEvent::Malformed`].
    pub fn parse(record: &str) -> Option<StreamEvent> {
        let payload = record.strip_prefix(DATA_PREFIX)?.trim();
        if payload.is_empty() {
            return None;
        }

        let frame = match serde_json::from_str::<FramePayload>(payload) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, frame = %payload, "Dropping malformed event frame");
                return Some(StreamEvent::Malformed {
                    reason: e.to_string(),
                });
            }
        };

        let message = frame.message.as_str().unwrap_or_default().to_string();

        let event = match Status::from_token(&frame.status) {
            Status::Complete => StreamEvent::Complete {
                message,
                answer: frame.answer.as_str().map(str::to_string),
            },
            Status::Error => StreamEvent::Error { message },
            status => StreamEvent::Progress {
                status,
                message,
                progress: parse_progress(&frame.progress),
            },
        };

        tracing::debug!(kind = event.kind(), status = %frame.status, "Parsed event frame");
        Some(event)
    }
}

/// Percentage from an arbitrary JSON value; anything non-numeric is 0
fn parse_progress(value: &Value) -> u8 {
    match value.as_f64() {
        Some(p) if p.is_finite() => p.clamp(0.0, 100.0).round() as u8,
        _ => 0,
    }
}
