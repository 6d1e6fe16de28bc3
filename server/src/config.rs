//! Authority configuration.

use std::path::PathBuf;

/// Configuration for the authority service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen address.
    pub listen_addr: String,
    /// PEM file with the RSA public key, used to verify license codes at
    /// registration and served on the publicKey endpoint.
    pub public_key_path: Option<PathBuf>,
    /// PEM file with the RSA private key, used to mint license codes.
    pub private_key_path: Option<PathBuf>,
    /// Seconds without a heartbeat before a node counts as dead.
    pub node_timeout_seconds: u64,
    /// Node registry snapshot file.
    pub node_persist_path: PathBuf,
    /// License record snapshot file.
    pub license_persist_path: PathBuf,
    /// Bearer token guarding the admin routes.
    pub admin_token: Option<String>,
    /// Serve admin routes without a token. Local development only.
    pub open_admin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8100".to_string(),
            public_key_path: None,
            private_key_path: None,
            node_timeout_seconds: 300,
            node_persist_path: PathBuf::from("./data/nodes.json"),
            license_persist_path: PathBuf::from("./data/licenses.json"),
            admin_token: None,
            open_admin: false,
        }
    }
}
