//! Request and response snapshots
//!
//! Capture never consumes what the handler or the client will read: bodies
//! go through [`Replay`] and the live message is rebuilt from the buffer.

pub mod body;

pub use body::{Replay, split};

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use axum::http::uri::Scheme;
use axum::http::{HeaderMap, HeaderName, StatusCode, Version};
use axum::response::Response;
use httplog_core::{
    AuditError, HeaderFields, RequestSnapshot, ResponseSnapshot, is_chunked_encoding,
};

/// Extension marker inserted by a TLS-terminating acceptor
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsSession;

/// The raw request-target, when the transport preserves it.
///
/// Parsed URIs drop the `#fragment` part, so the fragment echo is only
/// available through this extension. Hyper does not insert it: a transport
/// that wants fragment echoes must add it to the request extensions before
/// the audit middleware runs, otherwise `fragment` is always empty and
/// `request_uri` is the parsed URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget(pub String);

/// Canonical MIME form of a header name: `content-type` -> `Content-Type`
pub fn canonical_header_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

/// Group header values by canonical name, keeping arrival order per name
pub fn header_fields(headers: &HeaderMap) -> HeaderFields {
    let mut fields = HeaderFields::new();
    for (name, value) in headers {
        fields
            .entry(canonical_header_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    fields
}

/// JSON object string for a header set. An empty set is `{}`.
pub fn header_json(fields: &HeaderFields) -> Result<String, AuditError> {
    serde_json::to_string(fields).map_err(|e| AuditError::HeaderSerialization(e.to_string()))
}

/// Split `host:port` (or `[v6addr]:port`). A missing port is an error.
pub fn split_host_port(hostport: &str) -> Result<(String, String), AuditError> {
    let invalid = |reason: &str| AuditError::InvalidHost(format!("{hostport:?}: {reason}"));

    let (host, port) = if let Some(rest) = hostport.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| invalid("missing ']' in address"))?;
        let port = after.strip_prefix(':').ok_or_else(|| invalid("missing port"))?;
        (host, port)
    } else {
        let (host, port) = hostport
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;
        if host.contains(':') {
            return Err(invalid("too many colons in address"));
        }
        (host, port)
    };

    if port.contains(':') {
        return Err(invalid("too many colons in address"));
    }
    Ok((host.to_string(), port.to_string()))
}

/// Comma-joined values of a list-valued header
fn header_list(headers: &HeaderMap, name: HeaderName) -> String {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn version_numbers(version: Version) -> (u8, u8) {
    match version {
        Version::HTTP_09 => (0, 9),
        Version::HTTP_10 => (1, 0),
        Version::HTTP_2 => (2, 0),
        Version::HTTP_3 => (3, 0),
        _ => (1, 1),
    }
}

/// Whether the connection closes after this exchange
fn wants_close(headers: &HeaderMap, major: u8, minor: u8) -> bool {
    if major < 1 {
        return true;
    }
    let connection = header_list(headers, CONNECTION).to_ascii_lowercase();
    let mut tokens = connection.split(',');
    let has_close = tokens.clone().any(|t| t == "close");
    if major == 1 && minor == 0 {
        return has_close || !tokens.any(|t| t == "keep-alive");
    }
    has_close
}

/// Headers the request-line already carries, left out of the request header JSON
const FRAMING_HEADERS: [&str; 2] = ["Host", "Transfer-Encoding"];

fn without_framing(fields: &HeaderFields) -> HeaderFields {
    fields
        .iter()
        .filter(|(name, _)| !FRAMING_HEADERS.contains(&name.as_str()))
        .map(|(name, values)| (name.clone(), values.clone()))
        .collect()
}

/// Largest request body captured; longer bodies fail capture with `BodyRead`
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Snapshot an inbound request.
///
/// Returns the snapshot together with the request, whose body has been
/// restored to an unread copy of the original content. Nothing is
/// returned on failure.
pub async fn capture_request(request: Request) -> Result<(RequestSnapshot, Request), AuditError> {
    let (parts, body) = request.into_parts();

    let authority = parts
        .headers
        .get(HOST)
        .map(|h| String::from_utf8_lossy(h.as_bytes()).into_owned())
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .ok_or_else(|| AuditError::InvalidHost("request carries no host".to_string()))?;
    let (host, port) = split_host_port(&authority)?;

    let scheme = if parts.extensions.get::<TlsSession>().is_some()
        || parts.uri.scheme() == Some(&Scheme::HTTPS)
    {
        "https"
    } else {
        "http"
    };

    let headers = header_fields(&parts.headers);
    let header = header_json(&without_framing(&headers))?;

    let transfer_encoding = header_list(&parts.headers, TRANSFER_ENCODING);
    let chunked = is_chunked_encoding(&transfer_encoding);
    let content_length = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(if chunked { -1 } else { 0 });

    let replay = Replay::drain_limited(body, MAX_BODY_BYTES).await?;
    let trailer = header_json(&replay.trailers().map(header_fields).unwrap_or_default())?;

    let request_uri = parts
        .extensions
        .get::<RequestTarget>()
        .map(|t| t.0.clone())
        .unwrap_or_else(|| parts.uri.to_string());
    let fragment = request_uri
        .split_once('#')
        .map(|(_, f)| f.to_string())
        .unwrap_or_default();

    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    let (proto_major, proto_minor) = version_numbers(parts.version);

    let snapshot = RequestSnapshot {
        proto: format!("HTTP/{proto_major}.{proto_minor}"),
        proto_major,
        proto_minor,
        method: parts.method.to_string(),
        scheme: scheme.to_string(),
        host,
        port,
        path: parts.uri.path().to_string(),
        raw_query: parts.uri.query().unwrap_or_default().to_string(),
        fragment,
        header,
        headers,
        body: replay.dump(chunked),
        content_length,
        transfer_encoding,
        close: wants_close(&parts.headers, proto_major, proto_minor),
        trailer,
        remote_addr,
        request_uri,
    };

    Ok((snapshot, Request::from_parts(parts, replay.body())))
}

/// In-memory sink for the wrapped handler's response.
///
/// The handler's response is buffered completely; [`flush`](Self::flush)
/// then hands the client an identical response and keeps a separate copy
/// for capture.
pub struct ResponseRecorder {
    parts: axum::http::response::Parts,
    body: Replay,
}

impl ResponseRecorder {
    pub async fn record(response: Response) -> Result<Self, AuditError> {
        let (parts, body) = response.into_parts();
        let body = Replay::drain(body).await?;
        Ok(Self { parts, body })
    }

    pub fn status(&self) -> StatusCode {
        self.parts.status
    }

    /// Produce the client response (status, headers and body verbatim)
    /// and the recording used for the response snapshot
    pub fn flush(self) -> (Response, RecordedResponse) {
        let recorded = RecordedResponse {
            status: self.parts.status,
            headers: self.parts.headers.clone(),
            body: self.body.clone(),
        };
        (Response::from_parts(self.parts, self.body.body()), recorded)
    }
}

/// Buffered copy of a response already handed to the client
#[derive(Debug, Clone)]
pub struct RecordedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Replay,
}

impl RecordedResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Snapshot the recorded response
    pub fn snapshot(&self) -> Result<ResponseSnapshot, AuditError> {
        let header = header_json(&header_fields(&self.headers))?;
        let chunked = is_chunked_encoding(&header_list(&self.headers, TRANSFER_ENCODING));
        Ok(ResponseSnapshot {
            status: self.status.as_u16(),
            header,
            body: self.body.dump(chunked),
        })
    }
}
