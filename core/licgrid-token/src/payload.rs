//! The authorization payload carried inside a signed license code.

use serde::{Deserialize, Serialize};

/// Authorization payload.
///
/// Serialized as camelCase JSON with absent fields emitted as `null`;
/// the serialized bytes are what gets signed, so the shape is part of the
/// wire format. Requiredness (`expiry_time`, a positive
/// `max_machine_count`) is enforced by the issuer at mint time, not here,
/// so codes from older issuers still parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensePayload {
    /// Licensee the code was issued to.
    pub subject: String,
    /// Issue wall time, epoch milliseconds. Defaulted by the issuer.
    pub issued_time: Option<i64>,
    /// Expiry wall time, epoch milliseconds.
    pub expiry_time: Option<i64>,
    /// Concurrent machine cap.
    pub max_machine_count: Option<u32>,
    /// Licensed module names.
    pub modules: Option<Vec<String>>,
    /// Free-form note for operators.
    pub description: Option<String>,
}
