use serde::{Deserialize, Serialize};

/// Support payload that handlers can embed in response bodies.
///
/// Carries the request id and, optionally, echoes of the request URL so a
/// client can quote them when reporting a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<AuditUrl>,
}

/// URL echoes of the in-flight request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditUrl {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
}

/// Selects which URL echoes an [`Audit`] includes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditOpts {
    pub host: bool,
    pub port: bool,
    pub path: bool,
    pub query: bool,
    pub fragment: bool,
}

impl AuditOpts {
    pub const ALL: Self = Self {
        host: true,
        port: true,
        path: true,
        query: true,
        fragment: true,
    };

    /// Whether any URL echo is requested
    pub fn any(&self) -> bool {
        self.host || self.port || self.path || self.query || self.fragment
    }
}
