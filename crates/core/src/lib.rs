//! httplog-core: Shared audit types for the httplog middleware
//!
//! This crate holds the transport-free part of request auditing: the
//! audit record and its snapshots, the dispatch toggles, the payload
//! clients can echo back, and the error taxonomy.

pub mod audit;
pub mod error;
pub mod options;
pub mod record;

pub use audit::{Audit, AuditOpts, AuditUrl};
pub use error::AuditError;
pub use options::{ConsoleConfig, ConsoleToggle, DispatchConfig, DumpConfig, FieldToggles, StoreConfig};
pub use record::{
    AuditRecord, HeaderFields, RequestId, RequestSnapshot, ResponseSnapshot, is_chunked_encoding,
};
