//! Prediction request handling.
//!
//! Raw payload -> repair -> parse -> orchestrate -> encode. Every path ends in a
//! well-formed JSON body; payload problems become an error object.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::json;
use crate::orchestrator::Orchestrator;
use crate::repair::{repair, RepairMode};

/// Inbound prediction request message type
pub const PREDICTION_REQUEST: i32 = 30000;
/// Outbound prediction response message type
pub const PREDICTION_RESPONSE: i32 = 30002;

const INVALID_JSON: &str = "Invalid JSON payload";
const UNDECODABLE: &str = "Error processing payload";
const LOG_SNIPPET_CHARS: usize = 2048;

/// Opaque message payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
}

impl Payload {
    /// Payload as UTF-8 text
    pub fn decode(&self) -> Result<&str, std::str::Utf8Error> {
        match self {
            Payload::Bytes(bytes) => std::str::from_utf8(bytes),
            Payload::Text(text) => Ok(text.as_str()),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub msg_type: i32,
    pub payload: Payload,
}

impl InboundMessage {
    pub fn new(msg_type: i32, payload: impl Into<Payload>) -> Self {
        Self {
            msg_type,
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub msg_type: i32,
    pub payload: String,
}

/// Counters owned by the service and shared with its handlers
#[derive(Debug, Default)]
pub struct RequestStats {
    predict_requests: AtomicU64,
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) -> u64 {
        self.predict_requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn predict_requests(&self) -> u64 {
        self.predict_requests.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            predict_requests: self.predict_requests(),
        }
    }
}

/// Point-in-time view of [`RequestStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    #[serde(rename = "PredictRequests")]
    pub predict_requests: u64,
}

pub struct PredictionHandler {
    orchestrator: Arc<Orchestrator>,
    repair_mode: RepairMode,
    request_field: String,
    stats: Arc<RequestStats>,
}

impl PredictionHandler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        repair_mode: RepairMode,
        stats: Arc<RequestStats>,
    ) -> Self {
        let request_field = orchestrator.settings().request_field.clone();
        Self {
            orchestrator,
            repair_mode,
            request_field,
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<RequestStats> {
        &self.stats
    }

    /// Handle one prediction request, counting it
    pub fn handle(&self, payload: &Payload) -> OutboundMessage {
        let body = self.respond(payload);
        let handled = self.stats.record_request();
        debug!(handled, "prediction request handled");
        OutboundMessage {
            msg_type: PREDICTION_RESPONSE,
            payload: body,
        }
    }

    /// Response body for `payload`
    pub fn respond(&self, payload: &Payload) -> String {
        let text = match payload.decode() {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "payload is not valid UTF-8");
                return error_body(UNDECODABLE);
            }
        };

        let outcome = repair(text, self.repair_mode);
        let request: Value = match serde_json::from_str(outcome.text()) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, payload = %snippet(text), "invalid JSON payload");
                return error_body(INVALID_JSON);
            }
        };

        let terminals = terminal_ids(&request, &self.request_field);
        info!(terminals = terminals.len(), "prediction request");

        let result = self.orchestrator.predict_all(&terminals);
        match json::to_string(&result) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "failed to encode prediction result");
                error_body(UNDECODABLE)
            }
        }
    }
}

/// Terminal ids named by `field`; numbers become their decimal form
pub fn terminal_ids(request: &Value, field: &str) -> Vec<String> {
    let Some(entries) = request.get(field) else {
        return Vec::new();
    };
    let Some(entries) = entries.as_array() else {
        warn!(field, "request field is not an array");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            other => {
                warn!(entry = %other, "skipping non-scalar terminal id");
                None
            }
        })
        .collect()
}

/// `{"error": message}`
pub fn error_body(message: &str) -> String {
    format!("{{\"error\": {}}}", Value::from(message))
}

fn snippet(text: &str) -> &str {
    match text.char_indices().nth(LOG_SNIPPET_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
