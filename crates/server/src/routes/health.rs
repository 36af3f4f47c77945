//! Health check endpoint

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use deadpool_postgres::Pool;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl HealthResponse {
    fn unhealthy(reason: String) -> (StatusCode, Json<Self>) {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Self {
                status: "unhealthy",
                reason: Some(reason),
            }),
        )
    }
}

/// GET /health - Check that the audit store is reachable
pub async fn check(State(pool): State<Pool>) -> impl IntoResponse {
    let client = match pool.get().await {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Health check pool error");
            return HealthResponse::unhealthy(format!("Audit store connection failed: {}", e));
        }
    };

    match client.query_one("SELECT 1", &[]).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                reason: None,
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check query failed");
            HealthResponse::unhealthy(format!("Audit store query failed: {}", e))
        }
    }
}
