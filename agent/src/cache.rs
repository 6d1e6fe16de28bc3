//! Encrypted local cache of the last known-good authorization.
//!
//! The cache is what lets an application restart while the authority is
//! unreachable. It is sealed with a key derived from the public-key text;
//! editing the file breaks the GCM tag and the cache reads as absent.

use licgrid_token::LicensePayload;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, error, warn};

/// The cached authorization record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedLicense {
    /// The verified payload.
    pub payload: LicensePayload,
    /// Node id from the last registration, if any.
    pub node_id: Option<String>,
    /// Wall time of the last successful online verification (ms).
    pub last_verify_time: i64,
    /// The license code, kept for re-registration.
    pub license_code: String,
}

/// Sealed cache store at a fixed path.
pub struct CacheStore {
    path: PathBuf,
    key_source: String,
}

impl CacheStore {
    #[must_use]
    pub fn new(path: PathBuf, key_source: String) -> Self {
        Self { path, key_source }
    }

    /// Seals and writes the cache. Failures are logged, not returned; a
    /// missing cache only costs the next offline start.
    pub fn save(
        &self,
        payload: &LicensePayload,
        node_id: Option<&str>,
        license_code: &str,
        now_ms: i64,
    ) {
        let record = CachedLicense {
            payload: payload.clone(),
            node_id: node_id.map(str::to_string),
            last_verify_time: now_ms,
            license_code: license_code.to_string(),
        };

        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                error!("serializing license cache failed: {e}");
                return;
            }
        };
        let sealed = match licgrid_crypto::seal(&json, &self.key_source) {
            Ok(sealed) => sealed,
            Err(e) => {
                error!("sealing license cache failed: {e}");
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    error!("creating cache directory {} failed: {e}", parent.display());
                    return;
                }
            }
        }
        match fs::write(&self.path, sealed) {
            Ok(()) => debug!("license cache saved: {}", self.path.display()),
            Err(e) => error!("writing license cache {} failed: {e}", self.path.display()),
        }
    }

    /// Loads and opens the cache. Any problem (missing, unreadable,
    /// tampered, unparsable) yields `None`.
    #[must_use]
    pub fn load(&self) -> Option<CachedLicense> {
        let sealed = match fs::read_to_string(&self.path) {
            Ok(sealed) => sealed,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("license cache {} not present", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("reading license cache {} failed: {e}", self.path.display());
                return None;
            }
        };

        let json = match licgrid_crypto::open(&sealed, &self.key_source) {
            Ok(json) => json,
            Err(e) => {
                error!("license cache rejected, possibly tampered: {e}");
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(record) => Some(record),
            Err(e) => {
                error!("license cache contents invalid: {e}");
                None
            }
        }
    }

    /// Removes the cache file if present.
    pub fn delete(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("deleting license cache {} failed: {e}", self.path.display());
            }
        }
    }
}
