use thiserror::Error;

/// Errors raised while capturing, correlating or dispatching an audit record
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("{0} is not set in the request context")]
    NotSet(&'static str),

    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("Header serialization failed: {0}")]
    HeaderSerialization(String),

    #[error("Body read failed: {0}")]
    BodyRead(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Invalid logging options: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
