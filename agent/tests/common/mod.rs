//! Shared helpers for agent lifecycle tests: a real in-process authority
//! plus deterministic key material.

#![allow(dead_code)]

use licgrid_server::{build_router, AdminAuth, AppState, LicenseIssuer, NodeRegistry};
use licgrid_token::{mint, LicensePayload};
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

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

/// PEM text of the shared test public key.
pub fn public_pem() -> String {
    let (_, public) = test_keypair();
    public.to_public_key_pem(LineEnding::LF).unwrap()
}

/// Mints a license code with the shared test key.
pub fn mint_code(expiry_ms: i64, max_machines: u32) -> String {
    let (private, _) = test_keypair();
    let payload = LicensePayload {
        subject: "Acme Corp".to_string(),
        issued_time: Some(0),
        expiry_time: Some(expiry_ms),
        max_machine_count: Some(max_machines),
        modules: Some(vec!["core".to_string()]),
        description: None,
    };
    mint(&payload, private).unwrap()
}

/// An in-process authority that can be stopped and resumed on the same
/// port, for reconnection tests.
pub struct TestAuthority {
    pub base: String,
    pub addr: SocketAddr,
    pub state: AppState,
    pub registry: Arc<NodeRegistry>,
    pub dir: TempDir,
    stop: Option<oneshot::Sender<()>>,
    served: Option<JoinHandle<()>>,
}

pub async fn spawn_authority(node_timeout_seconds: u64) -> TestAuthority {
    let dir = tempfile::tempdir().unwrap();
    let (private, public) = test_keypair();

    let issuer = Arc::new(
        LicenseIssuer::load(
            Some(private.clone()),
            Some(public_pem()),
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
    let state = AppState {
        issuer,
        registry: Arc::clone(&registry),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, served) = serve(listener, state.clone());

    TestAuthority {
        base: format!("http://{addr}"),
        addr,
        state,
        registry,
        dir,
        stop: Some(stop),
        served: Some(served),
    }
}

fn serve(listener: TcpListener, state: AppState) -> (oneshot::Sender<()>, JoinHandle<()>) {
    let app = build_router(state, AdminAuth::new(None, true));
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });
    (tx, handle)
}

impl TestAuthority {
    /// Stops accepting and drains existing connections.
    pub async fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(served) = self.served.take() {
            let _ = served.await;
        }
    }

    /// Serves the same state again on the original port.
    pub async fn resume(&mut self) {
        for _ in 0..40 {
            match TcpListener::bind(self.addr).await {
                Ok(listener) => {
                    let (stop, served) = serve(listener, self.state.clone());
                    self.stop = Some(stop);
                    self.served = Some(served);
                    return;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(25)).await,
            }
        }
        panic!("could not rebind authority listener on {}", self.addr);
    }
}

/// A base URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
