//! AES-256-GCM sealing with a string-derived key.
//!
//! Wire layout is `IV ‖ ciphertext ‖ tag`, base64 encoded. The IV is
//! random per message; the 16-byte tag rides at the end of the
//! ciphertext where the AEAD implementation puts it.

use crate::error::{CryptoError, CryptoResult};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Size of the GCM IV in bytes (96 bits).
pub const IV_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Derives a 32-byte AES key from an arbitrary key string.
#[must_use]
pub fn derive_key(source: &str) -> [u8; 32] {
    Sha256::digest(source.as_bytes()).into()
}

/// A sealed (encrypted and authenticated) blob.
#[derive(Clone, Debug)]
pub struct SealedBox {
    /// Per-message random IV.
    pub iv: [u8; IV_SIZE],
    /// Ciphertext with the tag appended.
    pub ciphertext: Vec<u8>,
}

impl SealedBox {
    /// Encodes to base64 (`IV ‖ ciphertext ‖ tag`).
    #[must_use]
    pub fn to_base64(&self) -> String {
        let mut bytes = Vec::with_capacity(IV_SIZE + self.ciphertext.len());
        bytes.extend_from_slice(&self.iv);
        bytes.extend_from_slice(&self.ciphertext);
        STANDARD.encode(&bytes)
    }

    /// Decodes from base64, checking the minimum length.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::Tampered(format!("invalid base64: {e}")))?;

        if bytes.len() < IV_SIZE + TAG_SIZE {
            return Err(CryptoError::Tampered("sealed data too short".to_string()));
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&bytes[..IV_SIZE]);
        Ok(Self {
            iv,
            ciphertext: bytes[IV_SIZE..].to_vec(),
        })
    }
}

/// Seals `plaintext` under a key derived from `key_source`.
pub fn seal(plaintext: &str, key_source: &str) -> CryptoResult<String> {
    let key = derive_key(key_source);
    let cipher = Aes256Gcm::new((&key).into());

    let mut iv = [0u8; IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

    Ok(SealedBox { iv, ciphertext }.to_base64())
}

/// Opens a sealed blob. Fails on any decode or authentication error.
pub fn open(encoded: &str, key_source: &str) -> CryptoResult<String> {
    let sealed = SealedBox::from_base64(encoded)?;
    let key = derive_key(key_source);
    let cipher = Aes256Gcm::new((&key).into());

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&sealed.iv), sealed.ciphertext.as_ref())
        .map_err(|_| {
            CryptoError::Tampered("authentication failed (wrong key or altered data)".to_string())
        })?;

    String::from_utf8(plaintext).map_err(|e| CryptoError::Tampered(format!("invalid UTF-8: {e}")))
}
