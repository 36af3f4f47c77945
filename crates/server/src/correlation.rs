//! Correlation context
//!
//! The request id and URL echoes ride on the request's extensions so that
//! handler code at any depth can read them back. Each value has its own
//! private key type; only the accessor functions here touch them.

use axum::extract::FromRequestParts;
use axum::http::Extensions;
use axum::http::request::Parts;
use httplog_core::{Audit, AuditError, AuditOpts, AuditUrl, RequestId, RequestSnapshot};
use serde::Serialize;

use crate::error::AppError;

#[derive(Clone)]
struct IdKey(RequestId);

#[derive(Clone)]
struct HostKey(String);

#[derive(Clone)]
struct PortKey(String);

#[derive(Clone)]
struct PathKey(String);

#[derive(Clone)]
struct RawQueryKey(String);

#[derive(Clone)]
struct FragmentKey(String);

/// Insert `value` unless a value of the same type is already attached
fn attach_once<T: Clone + Send + Sync + 'static>(ext: &mut Extensions, value: T) {
    if ext.get::<T>().is_none() {
        ext.insert(value);
    }
}

/// Generate a fresh request id and attach it.
///
/// An id already attached to this context is kept and returned instead.
pub fn attach_request_id(ext: &mut Extensions) -> RequestId {
    if let Some(IdKey(id)) = ext.get::<IdKey>() {
        return id.clone();
    }
    let id = RequestId::new();
    ext.insert(IdKey(id.clone()));
    id
}

pub fn request_id(ext: &Extensions) -> Result<&str, AuditError> {
    ext.get::<IdKey>()
        .map(|IdKey(id)| id.as_str())
        .ok_or(AuditError::NotSet("request id"))
}

pub fn set_request_host(ext: &mut Extensions, host: impl Into<String>) {
    attach_once(ext, HostKey(host.into()));
}

pub fn request_host(ext: &Extensions) -> Result<&str, AuditError> {
    ext.get::<HostKey>()
        .map(|HostKey(v)| v.as_str())
        .ok_or(AuditError::NotSet("request host"))
}

pub fn set_request_port(ext: &mut Extensions, port: impl Into<String>) {
    attach_once(ext, PortKey(port.into()));
}

pub fn request_port(ext: &Extensions) -> Result<&str, AuditError> {
    ext.get::<PortKey>()
        .map(|PortKey(v)| v.as_str())
        .ok_or(AuditError::NotSet("request port"))
}

pub fn set_request_path(ext: &mut Extensions, path: impl Into<String>) {
    attach_once(ext, PathKey(path.into()));
}

pub fn request_path(ext: &Extensions) -> Result<&str, AuditError> {
    ext.get::<PathKey>()
        .map(|PathKey(v)| v.as_str())
        .ok_or(AuditError::NotSet("request path"))
}

pub fn set_request_raw_query(ext: &mut Extensions, query: impl Into<String>) {
    attach_once(ext, RawQueryKey(query.into()));
}

pub fn request_raw_query(ext: &Extensions) -> Result<&str, AuditError> {
    ext.get::<RawQueryKey>()
        .map(|RawQueryKey(v)| v.as_str())
        .ok_or(AuditError::NotSet("request raw query"))
}

pub fn set_request_fragment(ext: &mut Extensions, fragment: impl Into<String>) {
    attach_once(ext, FragmentKey(fragment.into()));
}

pub fn request_fragment(ext: &Extensions) -> Result<&str, AuditError> {
    ext.get::<FragmentKey>()
        .map(|FragmentKey(v)| v.as_str())
        .ok_or(AuditError::NotSet("request fragment"))
}

/// Attach the URL echoes of a freshly captured request
pub fn attach_url(ext: &mut Extensions, request: &RequestSnapshot) {
    set_request_host(ext, request.host.as_str());
    set_request_port(ext, request.port.as_str());
    set_request_path(ext, request.path.as_str());
    set_request_raw_query(ext, request.raw_query.as_str());
    set_request_fragment(ext, request.fragment.as_str());
}

/// Build the client-visible audit payload from the context
pub fn audit(ext: &Extensions, opts: &AuditOpts) -> Result<Audit, AuditError> {
    let id = request_id(ext)?.to_string();
    if !opts.any() {
        return Ok(Audit { id, url: None });
    }

    let echo = |enabled: bool, value: fn(&Extensions) -> Result<&str, AuditError>| {
        if enabled {
            value(ext).map(|v| Some(v.to_string()))
        } else {
            Ok(None)
        }
    };

    let url = AuditUrl {
        host: echo(opts.host, request_host)?,
        port: echo(opts.port, request_port)?,
        path: echo(opts.path, request_path)?,
        query: echo(opts.query, request_raw_query)?,
        fragment: echo(opts.fragment, request_fragment)?,
    };
    Ok(Audit { id, url: Some(url) })
}

/// Every correlation value of the in-flight request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correlation {
    pub request_id: String,
    pub host: String,
    pub port: String,
    pub path: String,
    pub raw_query: String,
    pub fragment: String,
}

impl Correlation {
    pub fn from_extensions(ext: &Extensions) -> Result<Self, AuditError> {
        Ok(Self {
            request_id: request_id(ext)?.to_string(),
            host: request_host(ext)?.to_string(),
            port: request_port(ext)?.to_string(),
            path: request_path(ext)?.to_string(),
            raw_query: request_raw_query(ext)?.to_string(),
            fragment: request_fragment(ext)?.to_string(),
        })
    }
}

impl<S> FromRequestParts<S> for Correlation
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_extensions(&parts.extensions)?)
    }
}
