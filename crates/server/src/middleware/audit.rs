//! Request/response auditing middleware

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use httplog_core::{AuditRecord, DispatchConfig};
use tokio::sync::oneshot;
use tracing::Instrument;

use super::adapter::Adapter;
use super::layer::AuditLayer;
use crate::capture::body::notify_when_dropped;
use crate::capture::{RecordedResponse, ResponseRecorder, capture_request};
use crate::correlation;
use crate::dispatch::{dispatch_request, dispatch_response};
use crate::error::AppError;
use crate::sink::AuditStore;

const REJECTION_MESSAGE: &str = "Unable to log request";

fn capture_failed(stage: &'static str) {
    metrics::counter!("httplog_capture_failures_total", "stage" => stage).increment(1);
}

fn reject() -> Response {
    AppError::Internal(REJECTION_MESSAGE.to_string()).into_response()
}

struct Inner {
    config: DispatchConfig,
    store: Option<Arc<dyn AuditStore>>,
}

/// Shared auditing state: the sink toggles and the optional audit store.
///
/// Cheap to clone. Every adapter shape wraps one of these.
#[derive(Clone)]
pub struct Auditor {
    inner: Arc<Inner>,
}

impl Auditor {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                store: None,
            }),
        }
    }

    pub fn with_store(config: DispatchConfig, store: Arc<dyn AuditStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                store: Some(store),
            }),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// Tower layer form
    pub fn layer(&self) -> AuditLayer {
        AuditLayer::new(self.clone())
    }

    /// Composable adapter form, for use with [`adapt`](super::adapt)
    pub fn adapter(&self) -> Adapter {
        super::adapter::audit_adapter(self.clone())
    }

    /// Audit one exchange around `handler`.
    ///
    /// A request that cannot be captured, or whose pre-handling dispatch
    /// fails, is answered with a 500 and `handler` never runs. The handler's
    /// response goes back unchanged; post-handling dispatch runs on a
    /// separate task once the client body has been dropped.
    ///
    /// That task is detached. Graceful shutdown does not wait for it, so
    /// records of exchanges finishing just before the runtime stops may
    /// never reach the sinks.
    ///
    /// Request bodies over [`MAX_BODY_BYTES`](crate::capture::MAX_BODY_BYTES)
    /// fail capture and are rejected the same way.
    pub(crate) async fn run<F, Fut, E>(&self, request: Request, handler: F) -> Result<Response, E>
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Result<Response, E>>,
    {
        let (snapshot, mut request) = match capture_request(request).await {
            Ok(captured) => captured,
            Err(e) => {
                capture_failed("request");
                tracing::warn!(error = %e, "Request capture failed");
                return Ok(reject());
            }
        };

        let ext = request.extensions_mut();
        let request_id = correlation::attach_request_id(ext);
        correlation::attach_url(ext, &snapshot);

        let mut record = AuditRecord::new(request_id.clone(), snapshot);
        record.start_timer();

        if let Err(e) = dispatch_request(&record, self.config()) {
            tracing::warn!(request_id = %request_id, error = %e, "Request dispatch failed");
            return Ok(reject());
        }

        let span = tracing::info_span!("request", request_id = %request_id);
        let response = handler(request).instrument(span).await?;

        let recorder = match ResponseRecorder::record(response).await {
            Ok(recorder) => recorder,
            Err(e) => {
                capture_failed("response");
                tracing::warn!(request_id = %request_id, error = %e, "Response body could not be read");
                return Ok(reject());
            }
        };

        let (response, recorded) = recorder.flush();
        let (delivered, on_delivery) = oneshot::channel();
        let (parts, body) = response.into_parts();
        let response = Response::from_parts(parts, notify_when_dropped(body, delivered));

        let auditor = self.clone();
        tokio::spawn(async move {
            // Resolves with Err once the client body is dropped
            let _ = on_delivery.await;
            auditor.finish(record, recorded).await;
        });

        Ok(response)
    }

    async fn finish(&self, mut record: AuditRecord, recorded: RecordedResponse) {
        record.stop_timer();

        match recorded.snapshot() {
            Ok(snapshot) => {
                record.record_response(snapshot);
            }
            Err(e) => {
                capture_failed("response");
                tracing::warn!(request_id = %record.request_id(), error = %e, "Response capture failed");
            }
        }

        let store = self.inner.store.as_deref();
        if let Err(e) = dispatch_response(&record, self.config(), store).await {
            tracing::warn!(request_id = %record.request_id(), error = %e, "Response dispatch failed");
        }
    }
}

/// Function-wrapper form, for `axum::middleware::from_fn_with_state`
pub async fn audit_middleware(
    State(auditor): State<Auditor>,
    request: Request,
    next: Next,
) -> Response {
    match auditor
        .run(request, |req| async move {
            Ok::<_, std::convert::Infallible>(next.run(req).await)
        })
        .await
    {
        Ok(response) => response,
        Err(never) => match never {},
    }
}
