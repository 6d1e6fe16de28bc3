//! Agent configuration.

use std::path::PathBuf;

/// Configuration for the embedded license agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// License code issued by the authority.
    pub code: Option<String>,
    /// Authority base URL.
    pub server_url: String,
    /// RSA public key PEM text. Preferred over `public_key_path`.
    pub public_key: Option<String>,
    /// Path to the RSA public key PEM file.
    pub public_key_path: Option<PathBuf>,
    /// Heartbeat cadence in seconds.
    pub heartbeat_interval_seconds: u64,
    /// Offline grace budget in hours.
    pub grace_period_hours: u64,
    /// Sealed cache file path.
    pub cache_path: PathBuf,
    /// Request-path prefixes a host interceptor should exempt from
    /// license checks. The agent carries these for its host; it does not
    /// intercept requests itself.
    pub exclude_paths: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            code: None,
            server_url: "http://localhost:8100".to_string(),
            public_key: None,
            public_key_path: None,
            heartbeat_interval_seconds: 120,
            grace_period_hours: 72,
            cache_path: PathBuf::from("./.license-cache"),
            exclude_paths: vec!["/health".to_string(), "/metrics".to_string()],
        }
    }
}
