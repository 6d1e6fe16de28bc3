//! License payload and signed license-code codec for licgrid.
//!
//! A license code is `base64url(payload_json).base64url(signature)` with
//! padding stripped; the signature is SHA256withRSA over the raw payload
//! JSON bytes. This crate mints and verifies codes and loads the RSA key
//! material; validity-window checks are the caller's job, because mint
//! time and verification time have different clocks.

mod codec;
mod error;
mod payload;

pub use codec::{load_private_key, load_public_key, mint, verify};
pub use error::{TokenError, TokenResult};
pub use payload::LicensePayload;
