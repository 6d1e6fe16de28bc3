//! License-code minting and verification.
//!
//! Verification checks the exact bytes that were signed before any JSON
//! parsing happens: split on the first `.`, decode both halves, verify
//! the signature over the payload bytes, then parse. Each step maps to
//! its own error so callers can distinguish a malformed code from a
//! forged one.

use crate::error::{TokenError, TokenResult};
use crate::payload::LicensePayload;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

/// Signs `payload` and assembles the license code string.
pub fn mint(payload: &LicensePayload, private_key: &RsaPrivateKey) -> TokenResult<String> {
    let json = serde_json::to_vec(payload)
        .map_err(|e| TokenError::Format(format!("payload serialization failed: {e}")))?;

    let digest = Sha256::digest(&json);
    let signature = private_key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| TokenError::Sign(e.to_string()))?;

    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(&json),
        URL_SAFE_NO_PAD.encode(&signature)
    ))
}

/// Verifies a license code and returns its payload.
///
/// No validity-window checks happen here; callers compare
/// `issued_time` / `expiry_time` against their own clock.
pub fn verify(code: &str, public_key: &RsaPublicKey) -> TokenResult<LicensePayload> {
    let code = code.trim();
    let (payload_b64, signature_b64) = code
        .split_once('.')
        .ok_or_else(|| TokenError::Format("missing `.` separator".to_string()))?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|e| TokenError::Format(format!("invalid payload base64: {e}")))?;
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|e| TokenError::Format(format!("invalid signature base64: {e}")))?;

    let digest = Sha256::digest(&payload_bytes);
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &signature)
        .map_err(|_| TokenError::Tampered)?;

    serde_json::from_slice(&payload_bytes)
        .map_err(|e| TokenError::Format(format!("invalid payload JSON: {e}")))
}

/// Loads an RSA private key from PKCS#8 PEM text.
pub fn load_private_key(pem: &str) -> TokenResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem.trim()).map_err(|e| TokenError::Key(e.to_string()))
}

/// Loads an RSA public key from SPKI PEM text.
pub fn load_public_key(pem: &str) -> TokenResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem.trim()).map_err(|e| TokenError::Key(e.to_string()))
}
