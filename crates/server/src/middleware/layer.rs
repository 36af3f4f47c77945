//! Tower layer form of the auditing middleware

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use tower::{Layer, Service};

use super::audit::Auditor;

#[derive(Clone)]
pub struct AuditLayer {
    auditor: Auditor,
}

impl AuditLayer {
    pub fn new(auditor: Auditor) -> Self {
        Self { auditor }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditService {
            inner,
            auditor: self.auditor.clone(),
        }
    }
}

/// Wraps an inner service and audits every exchange passing through it
#[derive(Clone)]
pub struct AuditService<S> {
    inner: S,
    auditor: Auditor,
}

impl<S> Service<Request> for AuditService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Take the service that was driven to readiness, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let auditor = self.auditor.clone();

        Box::pin(async move { auditor.run(request, move |req| inner.call(req)).await })
    }
}
