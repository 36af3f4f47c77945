//! Adapter composition form of the auditing middleware
//!
//! An [`Adapter`] turns one [`HttpService`] into another. A stack of them is
//! applied with [`adapt`].

use std::convert::Infallible;

use axum::extract::Request;
use axum::response::Response;
use tower::Layer;
use tower::util::BoxCloneSyncService;

use super::audit::Auditor;

/// Type-erased HTTP service that adapters consume and produce
pub type HttpService = BoxCloneSyncService<Request, Response, Infallible>;

pub type Adapter = Box<dyn FnOnce(HttpService) -> HttpService + Send>;

pub(crate) fn audit_adapter(auditor: Auditor) -> Adapter {
    Box::new(move |service| BoxCloneSyncService::new(auditor.layer().layer(service)))
}

/// Wrap `service` with each adapter in turn; the last adapter is outermost
pub fn adapt(service: HttpService, adapters: Vec<Adapter>) -> HttpService {
    adapters
        .into_iter()
        .fold(service, |service, adapter| adapter(service))
}
