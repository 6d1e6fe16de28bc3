//! License-code issuing and record management.

use crate::error::{ServerError, ServerResult};
use crate::persist;
use licgrid_token::{self as token, LicensePayload};
use licgrid_types::now_ms;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// A minted license code with its bookkeeping fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    /// Record id (32 hex chars).
    pub id: String,
    /// Copied from the payload for listings.
    pub subject: String,
    /// The signed license code.
    pub license_code: String,
    /// The payload that was signed.
    pub payload: LicensePayload,
    /// Mint wall time, epoch milliseconds.
    pub create_time: i64,
}

/// Issues license codes and keeps the durable record list.
pub struct LicenseIssuer {
    records: Mutex<Vec<LicenseRecord>>,
    private_key: Option<RsaPrivateKey>,
    public_key_pem: Option<String>,
    persist_path: PathBuf,
}

impl LicenseIssuer {
    /// Creates the issuer and recovers any persisted records.
    pub async fn load(
        private_key: Option<RsaPrivateKey>,
        public_key_pem: Option<String>,
        persist_path: PathBuf,
    ) -> Self {
        let records: Vec<LicenseRecord> = match persist::read_json::<Vec<LicenseRecord>>(&persist_path).await {
            Ok(Some(records)) => {
                info!("license records recovered: {} entries", records.len());
                records
            }
            Ok(None) => {
                info!(
                    "license snapshot {} not found, starting empty",
                    persist_path.display()
                );
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "license snapshot {} unreadable, starting empty: {e}",
                    persist_path.display()
                );
                Vec::new()
            }
        };

        Self {
            records: Mutex::new(records),
            private_key,
            public_key_pem,
            persist_path,
        }
    }

    /// Mints a license code from `payload` and appends a record.
    pub async fn mint(&self, mut payload: LicensePayload) -> ServerResult<LicenseRecord> {
        let Some(private_key) = &self.private_key else {
            return Err(ServerError::Config(
                "private key not configured, cannot mint license codes".to_string(),
            ));
        };

        if payload.subject.trim().is_empty() {
            return Err(ServerError::InvalidRequest(
                "subject must not be empty".to_string(),
            ));
        }
        if payload.expiry_time.is_none() {
            return Err(ServerError::InvalidRequest(
                "expiryTime is required".to_string(),
            ));
        }
        if !payload.max_machine_count.is_some_and(|n| n > 0) {
            return Err(ServerError::InvalidRequest(
                "maxMachineCount must be positive".to_string(),
            ));
        }
        if payload.issued_time.is_none() {
            payload.issued_time = Some(now_ms());
        }

        let code =
            token::mint(&payload, private_key).map_err(|e| ServerError::Internal(e.to_string()))?;

        let record = LicenseRecord {
            id: Uuid::new_v4().simple().to_string(),
            subject: payload.subject.clone(),
            license_code: code,
            payload,
            create_time: now_ms(),
        };

        let mut records = self.records.lock().await;
        records.push(record.clone());
        self.persist(&records).await;

        info!(
            "license minted: id={}, subject={}, expiryTime={:?}, maxMachineCount={:?}",
            record.id, record.subject, record.payload.expiry_time, record.payload.max_machine_count
        );
        Ok(record)
    }

    /// All issued records.
    pub async fn list(&self) -> Vec<LicenseRecord> {
        self.records.lock().await.clone()
    }

    /// Deletes a record. Returns false when the id is unknown.
    pub async fn delete(&self, id: &str) -> bool {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        let removed = records.len() != before;
        if removed {
            self.persist(&records).await;
            info!("license record deleted: id={id}");
        }
        removed
    }

    /// PEM text of the verification key, when configured.
    #[must_use]
    pub fn public_key_pem(&self) -> Option<&str> {
        self.public_key_pem.as_deref()
    }

    /// Mirrors the record list to disk. Failures are logged; the in-memory
    /// mutation already committed.
    async fn persist(&self, records: &[LicenseRecord]) {
        if let Err(e) = persist::write_json_atomic(&self.persist_path, &records).await {
            error!(
                "persisting license records to {} failed: {e}",
                self.persist_path.display()
            );
        }
    }
}
