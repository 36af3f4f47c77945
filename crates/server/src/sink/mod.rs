//! Audit record destinations

pub mod console;
pub mod dump;
pub mod store;

pub use store::{AuditLogEntry, AuditStore, StoreFuture};
