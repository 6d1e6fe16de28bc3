//! Shared test helpers for codec tests.

#![allow(dead_code)]

use licgrid_token::LicensePayload;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::sync::OnceLock;

/// Returns a process-wide RSA key pair. 2048-bit generation is slow in
/// debug builds, so it happens once per test binary.
pub fn test_keypair() -> (&'static RsaPrivateKey, RsaPublicKey) {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    let private = KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, 2048).expect("generate RSA key")
    });
    (private, private.to_public_key())
}

/// A well-formed payload for an active license.
pub fn payload(subject: &str, max_machines: u32) -> LicensePayload {
    LicensePayload {
        subject: subject.to_string(),
        issued_time: Some(1_700_000_000_000),
        expiry_time: Some(4_102_444_800_000),
        max_machine_count: Some(max_machines),
        modules: Some(vec!["core".to_string(), "reports".to_string()]),
        description: Some("test license".to_string()),
    }
}
