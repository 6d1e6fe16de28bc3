//! Error types for license-code encoding and verification.

use thiserror::Error;

/// Errors raised while minting or verifying license codes.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Structural problem: missing separator, bad base64, bad JSON.
    #[error("invalid license code format: {0}")]
    Format(String),

    /// The RSA signature did not verify; the code was altered or signed
    /// by a different key.
    #[error("license code signature invalid")]
    Tampered,

    /// The PEM key material could not be parsed.
    #[error("invalid RSA key: {0}")]
    Key(String),

    /// Producing the signature failed.
    #[error("signing failed: {0}")]
    Sign(String),
}

/// Result alias for codec operations.
pub type TokenResult<T> = Result<T, TokenError>;
