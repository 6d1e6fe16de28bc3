//! Authority error taxonomy, mapped onto the response envelope.

use licgrid_token::TokenError;
use thiserror::Error;

/// Errors surfaced by authority operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Request body failed validation.
    #[error("{0}")]
    InvalidRequest(String),

    /// The license code failed verification (malformed or bad signature).
    #[error("license code rejected: {0}")]
    BadLicense(#[from] TokenError),

    /// The license code is past its expiry time.
    #[error("license code has expired")]
    Expired,

    /// The license code is not yet inside its validity window.
    #[error("license code is not yet valid")]
    NotYetValid,

    /// The concurrency cap for this license code is reached.
    #[error("licensed machine limit reached: max {max}, currently online {current}")]
    Capacity { max: u32, current: usize },

    /// The referenced node or record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Server-side configuration is missing or unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Envelope (and HTTP status) code for this error.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::BadLicense(_) | Self::Expired | Self::NotYetValid | Self::Capacity { .. } => 403,
            Self::NotFound(_) => 404,
            Self::Config(_) | Self::Internal(_) => 500,
        }
    }
}

/// Result alias for authority operations.
pub type ServerResult<T> = Result<T, ServerError>;
