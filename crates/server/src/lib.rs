//! httplog-server library crate
//!
//! HTTP request/response auditing: capture, correlation, timing, and
//! dispatch to console and database sinks. `build_app` assembles the demo
//! router; the binary entrypoint is in `main.rs`.

pub mod capture;
pub mod config;
pub mod correlation;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod middleware;
mod routes;
pub mod sink;

use std::sync::Arc;

use axum::{Extension, Router, middleware as axum_mw, routing::get};
use deadpool_postgres::Pool;
use httplog_core::DispatchConfig;
use tower_http::trace::TraceLayer;

use middleware::{Auditor, audit_middleware};

/// Build the demo router, audited with `dispatch` into the pool's audit log.
///
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a TCP port.
pub fn build_app(pool: Pool, dispatch: DispatchConfig) -> Router {
    let store = Arc::new(db::AuditLogRepository::new(pool.clone()));
    let auditor = Auditor::with_store(dispatch, store);

    // build_recorder() + set_global_recorder() so that repeated calls
    // (e.g. in integration tests) keep the first recorder and still get a handle
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::get))
        .route(
            "/widgets",
            get(routes::widgets::list).post(routes::widgets::create),
        )
        .layer(Extension(prometheus_handle))
        .with_state(pool)
        .layer(axum_mw::from_fn_with_state(auditor, audit_middleware))
        .layer(TraceLayer::new_for_http())
}
