//! The per-request audit record and its request/response snapshots

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header names in canonical form mapped to their values in arrival order
pub type HeaderFields = BTreeMap<String, Vec<String>>;

/// Unique identifier generated once for each inbound request.
///
/// Backed by a UUIDv7, so the string form sorts by creation time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable copy of an inbound request taken before the handler runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    #[serde(rename = "protocol")]
    pub proto: String,
    #[serde(rename = "protocol_major")]
    pub proto_major: u8,
    #[serde(rename = "protocol_minor")]
    pub proto_minor: u8,
    #[serde(rename = "request_method")]
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub port: String,
    pub path: String,
    #[serde(rename = "query")]
    pub raw_query: String,
    pub fragment: String,
    /// Headers as a JSON object string
    pub header: String,
    /// Headers in structured form, kept for the wire dump
    #[serde(skip)]
    pub headers: HeaderFields,
    pub body: String,
    pub content_length: i64,
    pub transfer_encoding: String,
    pub close: bool,
    /// Trailers as a JSON object string
    pub trailer: String,
    #[serde(rename = "remote_address")]
    pub remote_addr: String,
    pub request_uri: String,
}

/// Whether a comma-joined `Transfer-Encoding` value starts with `chunked`
pub fn is_chunked_encoding(transfer_encoding: &str) -> bool {
    transfer_encoding
        .split(',')
        .next()
        .is_some_and(|te| te.trim().eq_ignore_ascii_case("chunked"))
}

impl RequestSnapshot {
    /// Whether the request declared `Transfer-Encoding: chunked`
    pub fn is_chunked(&self) -> bool {
        is_chunked_encoding(&self.transfer_encoding)
    }
}

/// Immutable copy of the response the wrapped handler produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    #[serde(rename = "response_code")]
    pub status: u16,
    pub header: String,
    pub body: String,
}

/// Captured request, response and timing for one HTTP exchange.
///
/// The request snapshot is fixed at construction. The response snapshot is
/// recorded once, after the handler completes. Timestamps are UTC; the
/// duration comes from the monotonic clock.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    request_id: RequestId,
    client_id: Option<String>,
    started_at: Option<Instant>,
    time_started: Option<DateTime<Utc>>,
    time_finished: Option<DateTime<Utc>>,
    duration: Option<TimeDelta>,
    request: RequestSnapshot,
    response: Option<ResponseSnapshot>,
}

impl AuditRecord {
    pub fn new(request_id: RequestId, request: RequestSnapshot) -> Self {
        Self {
            request_id,
            client_id: None,
            started_at: None,
            time_started: None,
            time_finished: None,
            duration: None,
            request,
            response: None,
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Attach a caller identifier supplied by an outer layer (e.g. auth)
    pub fn set_client_id(&mut self, client_id: impl Into<String>) {
        self.client_id = Some(client_id.into());
    }

    pub fn request(&self) -> &RequestSnapshot {
        &self.request
    }

    pub fn response(&self) -> Option<&ResponseSnapshot> {
        self.response.as_ref()
    }

    /// Status code of the recorded response, 0 until one is recorded
    pub fn response_code(&self) -> u16 {
        self.response.as_ref().map_or(0, |r| r.status)
    }

    /// Record the response snapshot.
    ///
    /// Returns `false` and leaves the record untouched if a response was
    /// already recorded.
    pub fn record_response(&mut self, response: ResponseSnapshot) -> bool {
        if self.response.is_some() {
            return false;
        }
        self.response = Some(response);
        true
    }

    /// Mark the start of handler execution
    pub fn start_timer(&mut self) {
        if self.time_started.is_none() {
            self.started_at = Some(Instant::now());
            self.time_started = Some(Utc::now());
        }
    }

    /// Mark the end of handler execution and compute the elapsed time.
    ///
    /// The duration is measured on the monotonic clock, so a wall-clock step
    /// between the two points shifts the timestamps but not the duration.
    pub fn stop_timer(&mut self) {
        if self.time_finished.is_some() {
            return;
        }
        self.time_finished = Some(Utc::now());
        self.duration = self
            .started_at
            .and_then(|started| TimeDelta::from_std(started.elapsed()).ok());
    }

    pub fn time_started(&self) -> Option<DateTime<Utc>> {
        self.time_started
    }

    pub fn time_finished(&self) -> Option<DateTime<Utc>> {
        self.time_finished
    }

    pub fn duration(&self) -> Option<TimeDelta> {
        self.duration
    }

    /// Elapsed handler time in whole milliseconds, 0 while the timer runs
    pub fn duration_millis(&self) -> i64 {
        self.duration.map_or(0, |d| d.num_milliseconds())
    }
}
