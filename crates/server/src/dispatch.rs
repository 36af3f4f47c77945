//! Dispatch controller
//!
//! Routes a finished audit record to the sinks enabled in a
//! [`DispatchConfig`]. The console sink cannot fail, so a store failure is
//! the only error either function reports.

use std::io;

use httplog_core::{AuditError, AuditRecord, DispatchConfig};

use crate::sink::{AuditLogEntry, AuditStore, console, dump};

fn count(sink: &'static str, outcome: &'static str) {
    metrics::counter!("httplog_dispatch_total", "sink" => sink, "outcome" => outcome).increment(1);
}

/// Offer the request half of `record` to the sinks, before the handler runs.
///
/// An enabled raw dump replaces console output entirely.
pub fn dispatch_request(record: &AuditRecord, config: &DispatchConfig) -> Result<(), AuditError> {
    if config.dump.enable {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        return match dump::write_request_dump(&mut out, record.request(), config.dump.body) {
            Ok(()) => {
                count("dump", "ok");
                Ok(())
            }
            Err(e) => {
                count("dump", "error");
                Err(AuditError::Dispatch(format!("request dump: {}", e)))
            }
        };
    }

    if config.console.request.enable {
        console::log_request(record, &config.console.request.fields);
        count("console_request", "ok");
    }
    Ok(())
}

/// Offer the completed `record` to the sinks, after the response went out.
///
/// Console output comes first and never prevents the store attempt.
pub async fn dispatch_response(
    record: &AuditRecord,
    config: &DispatchConfig,
    store: Option<&dyn AuditStore>,
) -> Result<(), AuditError> {
    if config.console.response.enable {
        console::log_response(record, &config.console.response.fields);
        count("console_response", "ok");
    }

    if !config.store.enable {
        return Ok(());
    }

    let Some(store) = store else {
        count("store", "error");
        return Err(AuditError::Dispatch(
            "store sink is enabled but no store is configured".to_string(),
        ));
    };

    let entry = AuditLogEntry::new(record, &config.store);
    match store.log_request(entry).await {
        Ok(rows) => {
            count("store", "ok");
            tracing::debug!(request_id = %record.request_id(), rows, "Audit row stored");
            Ok(())
        }
        Err(e) => {
            count("store", "error");
            Err(AuditError::Dispatch(e.to_string()))
        }
    }
}
