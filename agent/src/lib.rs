//! Embedded licensing agent for applications licensed through a licgrid
//! authority.
//!
//! The agent verifies its configured license code, registers this machine
//! with the authority, keeps the registration alive with heartbeats, and
//! falls back to a sealed offline cache bounded by a monotonic grace
//! budget when the authority is unreachable. Host applications read the
//! outcome through a [`LicenseHandle`], whose `is_valid()` is a lock-free
//! atomic load suitable for per-request checks.
//!
//! ```no_run
//! use licgrid_agent::{AgentConfig, LicenseAgent};
//!
//! # async fn run() {
//! let config = AgentConfig {
//!     code: Some("…license code…".to_string()),
//!     server_url: "http://localhost:8100".to_string(),
//!     public_key_path: Some("./license-public.pem".into()),
//!     ..AgentConfig::default()
//! };
//! let agent = LicenseAgent::new(config).expect("agent construction");
//! agent.start().await;
//!
//! let handle = agent.handle();
//! if !handle.is_valid() {
//!     eprintln!("license invalid: {}", handle.message());
//! }
//! # }
//! ```

mod agent;
mod cache;
mod client;
pub mod clock;
mod config;
mod error;
pub mod fingerprint;
mod status;
mod tamper;

pub use agent::LicenseAgent;
pub use cache::{CacheStore, CachedLicense};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::AgentConfig;
pub use error::{AgentError, AgentResult};
pub use status::{LicenseHandle, LicenseState, StatusSnapshot};
pub use tamper::TamperGuard;
