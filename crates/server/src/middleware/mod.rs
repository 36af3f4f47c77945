//! Auditing middleware in three composition shapes

pub mod adapter;
pub mod audit;
pub mod layer;

pub use adapter::{Adapter, HttpService, adapt};
pub use audit::{Auditor, audit_middleware};
pub use layer::{AuditLayer, AuditService};
