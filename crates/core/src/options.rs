//! Dispatch toggles
//!
//! Which sinks receive an audit record, and which optional fields
//! (headers, body) each sink includes. Every level defaults to off, so a
//! partial options file only turns on what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AuditError;

/// Root of the toggle tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub console: ConsoleConfig,
    pub store: StoreConfig,
    pub dump: DumpConfig,
}

/// Structured console logging of requests and responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub request: ConsoleToggle,
    pub response: ConsoleToggle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleToggle {
    pub enable: bool,
    pub fields: FieldToggles,
}

/// Audit-log table writes. Nothing is written unless `enable` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub enable: bool,
    pub request: FieldToggles,
    pub response: FieldToggles,
}

/// Raw wire-format request dump. Replaces console request logging when on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    pub enable: bool,
    pub body: bool,
}

/// Optional request/response fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldToggles {
    pub header: bool,
    pub body: bool,
}

impl FieldToggles {
    pub const ALL: Self = Self {
        header: true,
        body: true,
    };
}

impl DispatchConfig {
    /// Console and store sinks on with every field included; dump off
    pub fn verbose() -> Self {
        let console = ConsoleToggle {
            enable: true,
            fields: FieldToggles::ALL,
        };
        Self {
            console: ConsoleConfig {
                request: console.clone(),
                response: console,
            },
            store: StoreConfig {
                enable: true,
                request: FieldToggles::ALL,
                response: FieldToggles::ALL,
            },
            dump: DumpConfig::default(),
        }
    }

    /// Parse options from a JSON document
    pub fn from_json(json: &str) -> Result<Self, AuditError> {
        serde_json::from_str(json).map_err(|e| AuditError::InvalidConfig(e.to_string()))
    }

    /// Load options from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}
