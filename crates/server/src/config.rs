//! Server configuration

use httplog_core::{AuditError, DispatchConfig};

/// Server configuration loaded from environment variables
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// JSON file with the sink toggles; `None` leaves every sink off
    pub options_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "host=localhost user=postgres dbname=httplog".into()),
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            options_path: std::env::var("HTTPLOG_OPTIONS").ok().filter(|p| !p.is_empty()),
        }
    }

    pub fn dispatch_config(&self) -> Result<DispatchConfig, AuditError> {
        match &self.options_path {
            Some(path) => DispatchConfig::from_file(path),
            None => Ok(DispatchConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(options_path: Option<&str>) -> Config {
        Config {
            database_url: String::new(),
            bind_address: "127.0.0.1:0".to_string(),
            options_path: options_path.map(str::to_string),
        }
    }

    #[test]
    fn test_no_options_file_turns_sinks_off() {
        assert_eq!(config(None).dispatch_config().unwrap(), DispatchConfig::default());
    }

    #[test]
    fn test_sample_options_file_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/httplog.json");
        let dispatch = config(Some(path)).dispatch_config().unwrap();
        assert!(dispatch.console.request.enable);
        assert!(dispatch.store.enable);
        assert!(!dispatch.dump.enable);
    }

    #[test]
    fn test_missing_options_file_is_io_error() {
        let err = config(Some("/nonexistent/httplog.json"))
            .dispatch_config()
            .unwrap_err();
        assert!(matches!(err, AuditError::Io(_)));
    }
}
