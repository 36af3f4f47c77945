use deadpool_postgres::Pool;

use crate::error::AppError;
use crate::sink::{AuditLogEntry, AuditStore, StoreFuture};

const LOG_REQUEST: &str = "SELECT api.log_request(\
    p_request_id => $1::text, \
    p_client_id => $2::text, \
    p_request_timestamp => $3::timestamptz, \
    p_response_code => $4::integer, \
    p_response_timestamp => $5::timestamptz, \
    p_duration_ms => $6::bigint, \
    p_protocol => $7::text, \
    p_protocol_major => $8::integer, \
    p_protocol_minor => $9::integer, \
    p_method => $10::text, \
    p_scheme => $11::text, \
    p_host => $12::text, \
    p_port => $13::text, \
    p_path => $14::text, \
    p_remote_address => $15::text, \
    p_request_content_length => $16::bigint, \
    p_request_header => $17::text::jsonb, \
    p_request_body => $18::text, \
    p_response_header => $19::text::jsonb, \
    p_response_body => $20::text)";

/// Audit-log writes through the `api.log_request` database function
#[derive(Clone)]
pub struct AuditLogRepository {
    pool: Pool,
}

impl AuditLogRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert one entry in its own transaction, returning the row count.
    ///
    /// Any error drops the transaction uncommitted.
    pub async fn insert(&self, entry: &AuditLogEntry) -> Result<i32, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let stmt = tx.prepare(LOG_REQUEST).await?;

        let row = tx
            .query_one(
                &stmt,
                &[
                    &entry.request_id,
                    &entry.client_id,
                    &entry.request_timestamp,
                    &entry.response_code,
                    &entry.response_timestamp,
                    &entry.duration_millis,
                    &entry.protocol,
                    &entry.protocol_major,
                    &entry.protocol_minor,
                    &entry.method,
                    &entry.scheme,
                    &entry.host,
                    &entry.port,
                    &entry.path,
                    &entry.remote_address,
                    &entry.request_content_length,
                    &entry.request_header,
                    &entry.request_body,
                    &entry.response_header,
                    &entry.response_body,
                ],
            )
            .await?;
        let inserted: i32 = row.try_get(0)?;

        tx.commit().await?;
        Ok(inserted)
    }
}

impl AuditStore for AuditLogRepository {
    fn log_request(&self, entry: AuditLogEntry) -> StoreFuture<'_> {
        Box::pin(async move { self.insert(&entry).await })
    }
}
