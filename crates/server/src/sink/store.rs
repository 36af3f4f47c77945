//! Persistent audit-log sink

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use httplog_core::{AuditRecord, StoreConfig};

use crate::error::AppError;

pub type StoreFuture<'a> = Pin<Box<dyn Future<Output = Result<i32, AppError>> + Send + 'a>>;

/// Destination for completed audit records.
///
/// Each call writes one entry in its own transaction and resolves to the
/// number of rows inserted. A failed call must leave nothing behind.
pub trait AuditStore: Send + Sync + 'static {
    fn log_request(&self, entry: AuditLogEntry) -> StoreFuture<'_>;
}

/// One audit-log row, in the parameter order of `api.log_request`.
///
/// The four content fields are `None` when their toggle is off or when the
/// captured text is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEntry {
    pub request_id: String,
    pub client_id: Option<String>,
    pub request_timestamp: Option<DateTime<Utc>>,
    pub response_code: i32,
    pub response_timestamp: Option<DateTime<Utc>>,
    pub duration_millis: i64,
    pub protocol: String,
    pub protocol_major: i32,
    pub protocol_minor: i32,
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub port: String,
    pub path: String,
    pub remote_address: String,
    pub request_content_length: i64,
    pub request_header: Option<String>,
    pub request_body: Option<String>,
    pub response_header: Option<String>,
    pub response_body: Option<String>,
}

/// Jsonb columns reject `''` but accept NULL, so empty text becomes `None`
fn present(enabled: bool, value: &str) -> Option<String> {
    (enabled && !value.is_empty()).then(|| value.to_string())
}

impl AuditLogEntry {
    pub fn new(record: &AuditRecord, toggles: &StoreConfig) -> Self {
        let req = record.request();
        let resp = record.response();
        let resp_header = resp.map_or("", |r| r.header.as_str());
        let resp_body = resp.map_or("", |r| r.body.as_str());

        Self {
            request_id: record.request_id().to_string(),
            client_id: record.client_id().map(str::to_string),
            request_timestamp: record.time_started(),
            response_code: i32::from(record.response_code()),
            response_timestamp: record.time_finished(),
            duration_millis: record.duration_millis(),
            protocol: req.proto.clone(),
            protocol_major: i32::from(req.proto_major),
            protocol_minor: i32::from(req.proto_minor),
            method: req.method.clone(),
            scheme: req.scheme.clone(),
            host: req.host.clone(),
            port: req.port.clone(),
            path: req.path.clone(),
            remote_address: req.remote_addr.clone(),
            request_content_length: req.content_length,
            request_header: present(toggles.request.header, &req.header),
            request_body: present(toggles.request.body, &req.body),
            response_header: present(toggles.response.header, resp_header),
            response_body: present(toggles.response.body, resp_body),
        }
    }
}
