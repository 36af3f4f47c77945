//! Structured console sink
//!
//! Writes selected record fields as key/value pairs through `tracing`
//! under the `httplog` target. Formatting and delivery are up to the
//! installed subscriber.

use httplog_core::{AuditRecord, FieldToggles};

/// Log the request half of a record
pub fn log_request(record: &AuditRecord, fields: &FieldToggles) {
    let req = record.request();

    tracing::info!(
        target: "httplog",
        request_id = %record.request_id(),
        method = %req.method,
        scheme = %req.scheme,
        host = %req.host,
        port = %req.port,
        path = %req.path,
        protocol = %req.proto,
        proto_major = req.proto_major,
        proto_minor = req.proto_minor,
        content_length = req.content_length,
        transfer_encoding = %req.transfer_encoding,
        close = req.close,
        remote_addr = %req.remote_addr,
        request_uri = %req.request_uri,
        header_json = fields.header.then_some(req.header.as_str()),
        body = fields.body.then_some(req.body.as_str()),
        "Request Received"
    );
}

/// Log the response half of a record
pub fn log_response(record: &AuditRecord, fields: &FieldToggles) {
    let resp = record.response();
    let header = resp.filter(|_| fields.header).map(|r| r.header.as_str());
    let body = resp.filter(|_| fields.body).map(|r| r.body.as_str());

    tracing::info!(
        target: "httplog",
        request_id = %record.request_id(),
        response_code = record.response_code(),
        duration_ms = record.duration_millis(),
        response_header = header,
        response_body = body,
        "Response Sent"
    );
}
