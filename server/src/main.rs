//! Authority service binary.

use anyhow::{Context, Result};
use clap::Parser;
use licgrid_server::{build_router, AdminAuth, AppState, LicenseIssuer, NodeRegistry, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Cadence of the timed-out-node sweep.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "licgrid-server")]
#[command(about = "licgrid licensing authority")]
struct Args {
    /// HTTP listen address
    #[arg(long, default_value = "0.0.0.0:8100")]
    listen_addr: String,

    /// Path to the RSA public key (PEM), used to verify license codes
    #[arg(long)]
    public_key_path: Option<PathBuf>,

    /// Path to the RSA private key (PEM), used to mint license codes
    #[arg(long)]
    private_key_path: Option<PathBuf>,

    /// Seconds without a heartbeat before a node is swept
    #[arg(long, default_value_t = 300)]
    node_timeout_seconds: u64,

    /// Node registry snapshot file
    #[arg(long, default_value = "./data/nodes.json")]
    node_persist_path: PathBuf,

    /// License record snapshot file
    #[arg(long, default_value = "./data/licenses.json")]
    license_persist_path: PathBuf,

    /// Bearer token required on admin routes
    #[arg(long)]
    admin_token: Option<String>,

    /// Serve admin routes without a token (local development only)
    #[arg(long)]
    open_admin: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.listen_addr,
            public_key_path: self.public_key_path,
            private_key_path: self.private_key_path,
            node_timeout_seconds: self.node_timeout_seconds,
            node_persist_path: self.node_persist_path,
            license_persist_path: self.license_persist_path,
            admin_token: self.admin_token,
            open_admin: self.open_admin,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let config = args.into_config();

    let public_key_pem = match &config.public_key_path {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("read public key {}", path.display()))?,
        ),
        None => None,
    };
    let public_key = public_key_pem
        .as_deref()
        .map(licgrid_token::load_public_key)
        .transpose()
        .context("parse public key")?;
    let private_key = match &config.private_key_path {
        Some(path) => {
            let pem = std::fs::read_to_string(path)
                .with_context(|| format!("read private key {}", path.display()))?;
            Some(licgrid_token::load_private_key(&pem).context("parse private key")?)
        }
        None => None,
    };

    if public_key.is_some() {
        info!("RSA public key loaded, license verification enabled");
    } else {
        warn!("no public key configured, node registration will be refused");
    }
    if private_key.is_some() {
        info!("RSA private key loaded, license minting enabled");
    } else {
        warn!("no private key configured, license minting will be refused");
    }

    let issuer = Arc::new(
        LicenseIssuer::load(
            private_key,
            public_key_pem,
            config.license_persist_path.clone(),
        )
        .await,
    );
    let registry = Arc::new(
        NodeRegistry::load(
            public_key,
            config.node_timeout_seconds,
            config.node_persist_path.clone(),
        )
        .await,
    );

    {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.tick().await; // the first tick completes immediately
            loop {
                ticker.tick().await;
                registry.sweep().await;
            }
        });
    }

    let app = build_router(
        AppState { issuer, registry },
        AdminAuth::new(config.admin_token.clone(), config.open_admin),
    );
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("bind {}", config.listen_addr))?;
    info!("licgrid authority listening on {}", config.listen_addr);
    axum::serve(listener, app).await.context("serve http api")?;
    Ok(())
}
