//! licgrid authority: license issuing plus online-node bookkeeping.
//!
//! The authority signs license codes with its RSA private key and
//! enforces each code's concurrent-machine cap across registered nodes
//! via a register / heartbeat / unregister / sweep protocol. Both the
//! node registry and the license record list live in memory and are
//! mirrored to JSON snapshots with crash-safe atomic replace.

pub mod config;
pub mod error;
pub mod http;
pub mod issuer;
pub mod persist;
pub mod registry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use http::{build_router, AdminAuth, AppState};
pub use issuer::{LicenseIssuer, LicenseRecord};
pub use registry::{NodeRegistry, RegistryStats};
