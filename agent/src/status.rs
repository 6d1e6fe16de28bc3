//! Observable agent state.
//!
//! [`LicenseHandle`] is the agent-owned replacement for a process-global
//! status: `is_valid()` / `is_degraded()` are lock-free atomic loads
//! cheap enough for per-request checks, while [`snapshot`] takes a short
//! read lock for operator surfaces. Clones share one underlying state.
//!
//! [`snapshot`]: LicenseHandle::snapshot

use licgrid_token::LicensePayload;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// The three observable agent states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseState {
    /// Requests should be blocked.
    Invalid,
    /// Live contact with the authority.
    ValidOnline,
    /// Running on cached authorization; `message` reports remaining grace.
    ValidDegraded,
}

/// Point-in-time view of the agent state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub state: LicenseState,
    pub message: String,
    pub node_id: Option<String>,
    pub payload: Option<LicensePayload>,
}

#[derive(Debug)]
struct Fields {
    message: String,
    node_id: Option<String>,
    payload: Option<LicensePayload>,
}

#[derive(Debug)]
struct Inner {
    valid: AtomicBool,
    degraded: AtomicBool,
    fields: RwLock<Fields>,
}

/// Cloneable handle onto the agent's published state.
#[derive(Debug, Clone)]
pub struct LicenseHandle {
    inner: Arc<Inner>,
}

impl LicenseHandle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                valid: AtomicBool::new(false),
                degraded: AtomicBool::new(false),
                fields: RwLock::new(Fields {
                    message: "not licensed".to_string(),
                    node_id: None,
                    payload: None,
                }),
            }),
        }
    }

    /// True in both ONLINE and DEGRADED states. Lock-free.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.valid.load(Ordering::SeqCst)
    }

    /// True only while running degraded. Lock-free.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.inner.degraded.load(Ordering::SeqCst)
    }

    /// The current state as an enum.
    #[must_use]
    pub fn state(&self) -> LicenseState {
        match (self.is_valid(), self.is_degraded()) {
            (true, true) => LicenseState::ValidDegraded,
            (true, false) => LicenseState::ValidOnline,
            (false, _) => LicenseState::Invalid,
        }
    }

    /// Operator-readable reason for the current state.
    #[must_use]
    pub fn message(&self) -> String {
        self.read().message.clone()
    }

    /// The node id assigned by the authority, when registered.
    #[must_use]
    pub fn node_id(&self) -> Option<String> {
        self.read().node_id.clone()
    }

    /// The verified license payload, when any.
    #[must_use]
    pub fn payload(&self) -> Option<LicensePayload> {
        self.read().payload.clone()
    }

    /// Everything at once, for status endpoints.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let fields = self.read();
        StatusSnapshot {
            state: self.state(),
            message: fields.message.clone(),
            node_id: fields.node_id.clone(),
            payload: fields.payload.clone(),
        }
    }

    pub(crate) fn mark_online(
        &self,
        payload: LicensePayload,
        node_id: String,
        message: impl Into<String>,
    ) {
        {
            let mut fields = self.write();
            fields.payload = Some(payload);
            fields.node_id = Some(node_id);
            fields.message = message.into();
        }
        self.inner.degraded.store(false, Ordering::SeqCst);
        self.inner.valid.store(true, Ordering::SeqCst);
    }

    /// Enters degraded mode. `payload` of `None` keeps whatever payload is
    /// already published.
    pub(crate) fn mark_degraded(&self, payload: Option<LicensePayload>, message: impl Into<String>) {
        {
            let mut fields = self.write();
            if let Some(payload) = payload {
                fields.payload = Some(payload);
            }
            fields.message = message.into();
        }
        self.inner.degraded.store(true, Ordering::SeqCst);
        self.inner.valid.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mark_invalid(&self, message: impl Into<String>) {
        {
            let mut fields = self.write();
            fields.message = message.into();
        }
        self.inner.valid.store(false, Ordering::SeqCst);
        self.inner.degraded.store(false, Ordering::SeqCst);
    }

    pub(crate) fn set_node_id(&self, node_id: Option<String>) {
        self.write().node_id = node_id;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Fields> {
        self.inner
            .fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Fields> {
        self.inner
            .fields
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
