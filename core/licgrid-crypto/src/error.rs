//! Error types for the sealed-box layer.

use thiserror::Error;

/// Errors from sealing or opening cache blobs.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// The blob could not be decoded or failed authentication.
    #[error("sealed data rejected: {0}")]
    Tampered(String),
}

/// Result type for sealed-box operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
