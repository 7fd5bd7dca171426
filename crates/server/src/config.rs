use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use store::StoreConfig;
use tabular::TabularConfig;

use crate::error::{ServerError, ServerResult};

/// Environment variable prefix, e.g. `CHARTDECK_DATABASE_URL`.
pub const ENV_PREFIX: &str = "CHARTDECK";

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Store connection string (`memory://`, `redb://<path>`, `file://<path>`).
    /// Required.
    #[serde(default)]
    pub database_url: String,

    /// Database name, used as the collection namespace. Required.
    #[serde(default)]
    pub database_name: String,

    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path prefix for the API routes
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Cap on the number of entries `GET /status` returns
    #[serde(default = "default_status_list_limit")]
    pub status_list_limit: usize,

    /// CSV parsing options
    #[serde(default)]
    pub tabular: TabularConfig,
}

impl ServerConfig {
    /// Configuration with the two required fields set and defaults elsewhere.
    pub fn new(database_url: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            database_name: database_name.into(),
            bind_addr: default_bind_addr(),
            port: default_port(),
            api_prefix: default_api_prefix(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            status_list_limit: default_status_list_limit(),
            tabular: TabularConfig::default(),
        }
    }

    /// Load configuration from `.env`, an optional `server` config file and
    /// `CHARTDECK_*` environment variables, in increasing precedence.
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(env_source());

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> ServerResult<()> {
        if self.database_url.trim().is_empty() {
            return Err(ServerError::Config(format!(
                "database_url is required (set {ENV_PREFIX}_DATABASE_URL)"
            )));
        }
        if self.database_name.trim().is_empty() {
            return Err(ServerError::Config(format!(
                "database_name is required (set {ENV_PREFIX}_DATABASE_NAME)"
            )));
        }
        if !self.api_prefix.is_empty()
            && (!self.api_prefix.starts_with('/') || self.api_prefix.ends_with('/'))
        {
            return Err(ServerError::Config(format!(
                "api_prefix '{}' must start with '/' and must not end with '/'",
                self.api_prefix
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ServerError::Config("timeout_secs must be > 0".into()));
        }
        if self.max_body_size_mb == 0 {
            return Err(ServerError::Config("max_body_size_mb must be > 0".into()));
        }
        self.tabular
            .validate()
            .map_err(|e| ServerError::Config(format!("tabular: {e}")))?;
        self.store_config()
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        Ok(())
    }

    /// Store settings derived from this configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.database_url.trim(), self.database_name.trim())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> ServerResult<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("tabular.missing_markers")
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_status_list_limit() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_env(vars: &[(&str, &str)]) -> Result<ServerConfig, config::ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Config::builder()
            .add_source(env_source().source(Some(map)))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::new("memory://", "charts");
        assert_eq!(cfg.port, 8001);
        assert_eq!(cfg.api_prefix, "/api");
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.max_body_size_mb, 10);
        assert_eq!(cfg.status_list_limit, 1000);
        assert!(cfg.enable_cors);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::new("memory://", "charts");
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8001);
    }

    #[test]
    fn missing_database_settings_are_rejected() {
        let err = ServerConfig::new("", "charts").validate().unwrap_err();
        assert!(err.to_string().contains("CHARTDECK_DATABASE_URL"));

        let err = ServerConfig::new("memory://", " ").validate().unwrap_err();
        assert!(err.to_string().contains("CHARTDECK_DATABASE_NAME"));

        let cfg = from_env(&[]).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut cfg = ServerConfig::new("memory://", "charts");
        cfg.api_prefix = "/api/".into();
        assert!(cfg.validate().is_err());

        let mut cfg = ServerConfig::new("memory://", "charts");
        cfg.api_prefix = "api".into();
        assert!(cfg.validate().is_err());

        let mut cfg = ServerConfig::new("memory://", "charts");
        cfg.api_prefix = String::new();
        assert!(cfg.validate().is_ok());

        let mut cfg = ServerConfig::new("memory://", "charts");
        cfg.timeout_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = ServerConfig::new("memory://", "charts");
        cfg.tabular.delimiter = '"';
        assert!(cfg.validate().is_err());

        let cfg = ServerConfig::new("postgres://localhost", "charts");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn reads_prefixed_environment() {
        let cfg = from_env(&[
            ("CHARTDECK_DATABASE_URL", "memory://"),
            ("CHARTDECK_DATABASE_NAME", "charts"),
            ("CHARTDECK_PORT", "9000"),
            ("CHARTDECK_TABULAR__PAD_SHORT_ROWS", "true"),
        ])
        .unwrap();

        assert_eq!(cfg.database_url, "memory://");
        assert_eq!(cfg.database_name, "charts");
        assert_eq!(cfg.port, 9000);
        assert!(cfg.tabular.pad_short_rows);
        assert_eq!(cfg.tabular.delimiter, ',');
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_markers_from_environment() {
        let cfg = from_env(&[
            ("CHARTDECK_DATABASE_URL", "memory://"),
            ("CHARTDECK_DATABASE_NAME", "charts"),
            ("CHARTDECK_TABULAR__MISSING_MARKERS", "NA,-"),
        ])
        .unwrap();

        assert_eq!(cfg.tabular.missing_markers, vec!["NA", "-"]);
        assert_eq!(cfg.database_name, "charts");
    }
}
