//! Agent error type.

use thiserror::Error;

/// Errors surfaced while constructing the agent.
///
/// Runtime problems never reach the host application as errors; they are
/// absorbed into state transitions on the [`crate::LicenseHandle`].
#[derive(Debug, Error)]
pub enum AgentError {
    /// The configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP client could not be built.
    #[error("http client error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result alias for agent construction.
pub type AgentResult<T> = Result<T, AgentError>;
