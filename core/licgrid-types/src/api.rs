//! The `{code, message, data}` response envelope shared by every
//! authority endpoint.

use serde::{Deserialize, Serialize};

/// Response envelope.
///
/// `code == 200` means success; other values follow HTTP semantics
/// (400 validation, 401 admin auth, 403 policy reject, 404 missing,
/// 500 internal). Agents interpret the envelope code, not the transport
/// status, so the two may differ without breaking the protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Success with the default message.
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    /// Success with a custom message.
    pub fn ok_with(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 200,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Failure with an envelope code and a human-readable reason.
    pub fn fail(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// True when the envelope carries a success code.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == 200
    }
}
