//! Sealed-box encryption for the licgrid agent's offline cache.
//!
//! AES-256-GCM under a key derived by hashing a caller-supplied string —
//! in practice the PEM public-key text, which both sides of the protocol
//! already hold. GCM authenticates as well as encrypts, so any edit to
//! the stored file fails [`open`] instead of yielding garbage.

mod error;
mod sealed;

pub use error::{CryptoError, CryptoResult};
pub use sealed::{derive_key, open, seal, SealedBox, IV_SIZE, TAG_SIZE};
