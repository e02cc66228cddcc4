//! Server configuration (spec.md "Configuration" in SPEC_FULL.md), grounded
//! on the teacher's `config/server.rs` `ServerConfig::load()` /
//! `ServerConfigError` pattern, trimmed of the SSL/security/LDAP sections
//! this service has no use for.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(std::io::Error),
    #[error("failed to parse TOML: {0}")]
    ParseError(toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file, relative or absolute.
    pub path: String,
}

/// Admission control and retry policy for the [`crate::orchestrator::Orchestrator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default)]
    pub retry: crate::orchestrator::RetryConfig,
    /// WebSocket URL of the upstream graph executor (spec.md §6.4). The
    /// orchestrator drives a graph but does not implement one.
    #[serde(default = "default_graph_executor_url")]
    pub graph_executor_url: String,
}

fn default_max_concurrent() -> usize {
    5
}

fn default_graph_executor_url() -> String {
    "ws://127.0.0.1:9000/graph".to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            retry: crate::orchestrator::RetryConfig::default(),
            graph_executor_url: default_graph_executor_url(),
        }
    }
}

/// [`crate::health::WorktreeHealthChecker`] polling interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

fn default_check_interval_secs() -> u64 {
    60
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { check_interval_secs: default_check_interval_secs() }
    }
}

/// WebSocket keepalive settings for [`crate::ws::ws_handler`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsocketConfig {
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_send_timeout_secs() -> u64 {
    10
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval_secs(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

/// Complete server configuration, loaded from `conductord.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub websocket: WebsocketConfig,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ServerConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ServerConfigError::ReadError)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ServerConfigError> {
        toml::from_str(content).map_err(ServerConfigError::ParseError)
    }

    /// Loads configuration from the environment or a default location.
    ///
    /// Searches, in order:
    /// 1. `CONFIG_PATH` environment variable
    /// 2. `./conductord.toml`
    /// 3. `./config/conductord.toml`
    pub fn load() -> Result<Self, ServerConfigError> {
        if let Ok(config_path) = std::env::var("CONFIG_PATH") {
            return Self::from_file(config_path);
        }

        let paths = [PathBuf::from("conductord.toml"), PathBuf::from("config/conductord.toml")];
        for path in &paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Err(ServerConfigError::InvalidConfig(
            "configuration file not found; set CONFIG_PATH or place conductord.toml in the working directory"
                .to_string(),
        ))
    }

    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.database.path)
    }

    pub fn check_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.health.check_interval_secs)
    }

    pub fn ping_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.websocket.ping_interval_secs)
    }

    pub fn send_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.websocket.send_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let toml_content = r#"
[database]
path = "conductor.db"
"#;
        let config = ServerConfig::from_str(toml_content).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.database.path, "conductor.db");
        assert_eq!(config.orchestrator.max_concurrent, 5);
        assert_eq!(config.orchestrator.retry.max_retries, 3);
        assert_eq!(config.orchestrator.graph_executor_url, "ws://127.0.0.1:9000/graph");
        assert_eq!(config.health.check_interval_secs, 60);
        assert_eq!(config.websocket.ping_interval_secs, 30);
        assert_eq!(config.websocket.send_timeout_secs, 10);
    }

    #[test]
    fn parses_fully_specified_config() {
        let toml_content = r#"
listen_addr = "0.0.0.0:9000"

[database]
path = "/var/lib/conductor/conductor.db"

[orchestrator]
max_concurrent = 10
graph_executor_url = "ws://graph.internal:9100/graph"

[orchestrator.retry]
max_retries = 5
base_delay_ms = 500
max_delay_ms = 60000

[health]
check_interval_secs = 30

[websocket]
ping_interval_secs = 15
send_timeout_secs = 5
"#;
        let config = ServerConfig::from_str(toml_content).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.orchestrator.max_concurrent, 10);
        assert_eq!(config.orchestrator.retry.max_retries, 5);
        assert_eq!(config.orchestrator.retry.base_delay_ms, 500);
        assert_eq!(config.orchestrator.graph_executor_url, "ws://graph.internal:9100/graph");
        assert_eq!(config.health.check_interval_secs, 30);
        assert_eq!(config.websocket.send_timeout_secs, 5);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(ServerConfig::from_str("not valid toml {{{"), Err(ServerConfigError::ParseError(_))));
    }

    #[test]
    fn missing_database_section_fails_to_parse() {
        assert!(ServerConfig::from_str("listen_addr = \"127.0.0.1:8080\"").is_err());
    }

    #[test]
    fn load_without_config_path_or_file_fails() {
        std::env::remove_var("CONFIG_PATH");
        let dir = tempfile::tempdir().unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = ServerConfig::load();
        std::env::set_current_dir(original).unwrap();
        assert!(matches!(result, Err(ServerConfigError::InvalidConfig(_))));
    }
}
