//! Shared helpers for the HTTP API tests.

#![allow(dead_code)]

use licgrid_server::{build_router, AdminAuth, AppState, LicenseIssuer, NodeRegistry};
use licgrid_types::MachineInfo;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

/// Returns a process-wide RSA key pair. 2048-bit generation is slow in
/// debug builds, so it happens once per test binary.
pub fn test_keypair() -> (&'static RsaPrivateKey, RsaPublicKey) {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    let private = KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, 2048).expect("generate RSA key")
    });
    (private, private.to_public_key())
}

/// A running authority bound to an OS-assigned port.
pub struct TestServer {
    pub base: String,
    pub issuer: Arc<LicenseIssuer>,
    pub registry: Arc<NodeRegistry>,
    pub dir: TempDir,
}

/// Spins up the authority with a fresh temp data directory.
pub async fn spawn_server(auth: AdminAuth, node_timeout_seconds: u64) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let (private, public) = test_keypair();
    let public_pem = public.to_public_key_pem(LineEnding::LF).unwrap();

    let issuer = Arc::new(
        LicenseIssuer::load(
            Some(private.clone()),
            Some(public_pem),
            dir.path().join("licenses.json"),
        )
        .await,
    );
    let registry = Arc::new(
        NodeRegistry::load(
            Some(public),
            node_timeout_seconds,
            dir.path().join("nodes.json"),
        )
        .await,
    );

    let app = build_router(
        AppState {
            issuer: Arc::clone(&issuer),
            registry: Arc::clone(&registry),
        },
        auth,
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        issuer,
        registry,
        dir,
    }
}

/// An open-admin server, which most tests use.
pub async fn spawn_open_server() -> TestServer {
    spawn_server(AdminAuth::new(None, true), 300).await
}

/// A distinct machine fingerprint.
pub fn machine(id: &str) -> MachineInfo {
    MachineInfo {
        machine_id: Some(format!("machine-{id}")),
        mac_address: Some(vec![format!("AA-BB-CC-DD-EE-{id}")]),
        hostname: Some(format!("host-{id}")),
        ..MachineInfo::default()
    }
}

/// A mint request body with sensible defaults.
pub fn mint_body(subject: &str, expiry_ms: i64, max_machines: u32) -> serde_json::Value {
    serde_json::json!({
        "subject": subject,
        "expiryTime": expiry_ms,
        "maxMachineCount": max_machines,
        "modules": ["core"],
    })
}
