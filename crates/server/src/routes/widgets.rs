//! Demo resource that echoes its audit payload

use axum::{Json, http::Extensions};
use httplog_core::{Audit, AuditOpts};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::correlation;
use crate::error::AppError;

#[derive(Serialize)]
pub struct WidgetList {
    widgets: Vec<&'static str>,
    audit: Audit,
}

#[derive(Serialize)]
pub struct WidgetCreated {
    widget: JsonValue,
    audit: Audit,
}

/// GET /widgets - List widgets with every URL echo
pub async fn list(ext: Extensions) -> Result<Json<WidgetList>, AppError> {
    let audit = correlation::audit(&ext, &AuditOpts::ALL)?;
    Ok(Json(WidgetList {
        widgets: vec!["sprocket", "gear"],
        audit,
    }))
}

/// POST /widgets - Echo the submitted widget with the request id
pub async fn create(
    ext: Extensions,
    Json(widget): Json<JsonValue>,
) -> Result<Json<WidgetCreated>, AppError> {
    let audit = correlation::audit(&ext, &AuditOpts::default())?;
    Ok(Json(WidgetCreated { widget, audit }))
}
