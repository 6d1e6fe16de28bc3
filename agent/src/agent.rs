//! The agent lifecycle controller.
//!
//! One state machine with three observable states and one background
//! heartbeat task. Every runtime failure becomes a state transition on
//! the [`LicenseHandle`]; nothing in here panics or returns errors to
//! the host application once the agent is constructed.

use crate::cache::CacheStore;
use crate::client::AuthorityClient;
use crate::clock::{Clock, SystemClock};
use crate::config::AgentConfig;
use crate::error::AgentResult;
use crate::fingerprint;
use crate::status::LicenseHandle;
use crate::tamper::TamperGuard;
use licgrid_token::{self as token, LicensePayload, TokenError};
use licgrid_types::MachineInfo;
use rsa::RsaPublicKey;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Consecutive authority failures tolerated before degrading.
const MAX_FAILURES_BEFORE_DEGRADE: u32 = 3;

/// Fallback cache key when no public key text is configured.
const DEFAULT_CACHE_KEY: &str = "licgrid-default-cache-key";

enum RegisterOutcome {
    /// Registered; the handle is ONLINE.
    Registered,
    /// The authority said no; the handle is INVALID with its reason.
    Rejected,
    /// Transport failure; the handle is untouched.
    Unreachable,
}

enum DegradeOutcome {
    /// Running degraded off the cache.
    Degraded,
    /// No usable cache on disk.
    NoCache,
    /// The cache exists but degraded operation is not permitted; the
    /// handle is INVALID with the reason.
    Rejected,
}

/// Embedded license agent.
///
/// Construct once per process, call [`start`](Self::start), and hand the
/// [`LicenseHandle`] to whatever gates requests.
pub struct LicenseAgent {
    inner: Arc<AgentInner>,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

struct AgentInner {
    config: AgentConfig,
    client: AuthorityClient,
    handle: LicenseHandle,
    tamper: TamperGuard,
    cache: CacheStore,
    clock: Arc<dyn Clock>,
    machine: MachineInfo,
    public_key: Option<RsaPublicKey>,
    key_error: Option<String>,
    fail_count: AtomicU32,
}

impl LicenseAgent {
    /// Creates an agent with the system clock.
    pub fn new(config: AgentConfig) -> AgentResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Creates an agent with a caller-supplied clock (tests).
    pub fn with_clock(config: AgentConfig, clock: Arc<dyn Clock>) -> AgentResult<Self> {
        let client = AuthorityClient::new(&config.server_url)?;

        let mut key_error = None;
        let pem_text = match load_pem_text(&config) {
            Ok(pem) => pem,
            Err(e) => {
                key_error = Some(e);
                None
            }
        };
        let public_key = pem_text.as_deref().and_then(|pem| {
            match token::load_public_key(pem) {
                Ok(key) => Some(key),
                Err(e) => {
                    key_error = Some(format!("public key unusable: {e}"));
                    None
                }
            }
        });
        if public_key.is_none() && key_error.is_none() {
            key_error = Some("public key not configured".to_string());
        }

        let cache_key = pem_text.unwrap_or_else(|| DEFAULT_CACHE_KEY.to_string());
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(AgentInner {
                client,
                handle: LicenseHandle::new(),
                tamper: TamperGuard::new(config.grace_period_hours, Arc::clone(&clock)),
                cache: CacheStore::new(config.cache_path.clone(), cache_key),
                clock,
                machine: fingerprint::collect(),
                public_key,
                key_error,
                fail_count: AtomicU32::new(0),
                config,
            }),
            task: Mutex::new(None),
            shutdown,
        })
    }

    /// The observable state handle.
    #[must_use]
    pub fn handle(&self) -> LicenseHandle {
        self.inner.handle.clone()
    }

    /// Runs the startup sequence and, for every non-INVALID outcome,
    /// starts the heartbeat loop.
    pub async fn start(&self) {
        let inner = &self.inner;

        let Some(code) = inner.license_code() else {
            inner.handle.mark_invalid("license code not configured");
            error!("license code not configured, agent disabled");
            return;
        };

        if inner.public_key.is_none() {
            let reason = inner
                .key_error
                .clone()
                .unwrap_or_else(|| "public key not configured".to_string());
            inner.handle.mark_invalid(&reason);
            error!("{reason}, agent disabled");
            return;
        }

        let payload = match inner.verify_code(&code) {
            Ok(payload) => payload,
            Err(e) => {
                inner.handle.mark_invalid(format!("license code rejected: {e}"));
                error!("license code failed local verification: {e}");
                return;
            }
        };
        info!(
            "license code verified locally: subject={}, expiryTime={:?}",
            payload.subject, payload.expiry_time
        );

        match inner.try_register().await {
            RegisterOutcome::Registered => {}
            RegisterOutcome::Rejected => return,
            RegisterOutcome::Unreachable => match inner.try_degrade_from_cache() {
                DegradeOutcome::Degraded => {}
                DegradeOutcome::Rejected => return,
                DegradeOutcome::NoCache => {
                    // First-time offline start: the locally verified code is
                    // all we have. Its own expiry still binds us.
                    if inner.is_expired(&payload) {
                        inner.handle.mark_invalid("license code expired");
                        error!("license code expired, refusing offline start");
                        return;
                    }
                    inner.tamper.mark_offline();
                    inner
                        .cache
                        .save(&payload, None, &code, inner.clock.wall_ms());
                    let remaining = inner.tamper.remaining_grace_hours();
                    inner.handle.mark_degraded(
                        Some(payload),
                        format!("authority unreachable, {remaining} hours of grace remaining"),
                    );
                    warn!("authority unreachable with no usable cache, starting degraded on the verified code alone");
                }
            },
        }

        self.spawn_heartbeat_loop();
    }

    /// One heartbeat-loop iteration. The background task calls this on its
    /// cadence; exposed so tests can drive the lifecycle without waiting
    /// on the scheduler.
    pub async fn heartbeat_once(&self) {
        self.inner.heartbeat_once().await;
    }

    /// Stops the heartbeat loop, then best-effort unregisters.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }

        if let Some(node_id) = self.inner.handle.node_id() {
            match self.inner.client.unregister(&node_id).await {
                Ok(_) => info!("node unregistered: nodeId={node_id}"),
                Err(e) => warn!("unregister failed: {e}"),
            }
        }
    }

    fn spawn_heartbeat_loop(&self) {
        let inner = Arc::clone(&self.inner);
        let mut shutdown = self.shutdown.subscribe();
        let interval_seconds = inner.config.heartbeat_interval_seconds;
        let period = Duration::from_secs(interval_seconds.max(1));

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(period) => inner.heartbeat_once().await,
                    _ = shutdown.changed() => break,
                }
            }
        });
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        info!(
            "heartbeat loop started, interval {} seconds",
            interval_seconds
        );
    }
}

impl AgentInner {
    fn license_code(&self) -> Option<String> {
        self.config
            .code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }

    fn verify_code(&self, code: &str) -> Result<LicensePayload, TokenError> {
        match &self.public_key {
            Some(key) => token::verify(code, key),
            None => Err(TokenError::Key("public key not configured".to_string())),
        }
    }

    fn is_expired(&self, payload: &LicensePayload) -> bool {
        payload
            .expiry_time
            .is_some_and(|t| self.clock.wall_ms() > t)
    }

    async fn try_register(&self) -> RegisterOutcome {
        let Some(code) = self.license_code() else {
            self.handle.mark_invalid("license code not configured");
            return RegisterOutcome::Rejected;
        };

        match self.client.register(&code, &self.machine).await {
            Ok(resp) if resp.is_ok() => {
                let Some(node_id) = resp.data else {
                    warn!("authority accepted registration but returned no node id");
                    return RegisterOutcome::Unreachable;
                };
                let payload = match self.verify_code(&code) {
                    Ok(payload) => payload,
                    Err(e) => {
                        self.handle
                            .mark_invalid(format!("license code rejected: {e}"));
                        return RegisterOutcome::Rejected;
                    }
                };
                self.tamper.record_online_verify();
                self.cache
                    .save(&payload, Some(&node_id), &code, self.clock.wall_ms());
                self.fail_count.store(0, Ordering::SeqCst);
                self.handle
                    .mark_online(payload, node_id.clone(), "license valid");
                info!("registered with authority: nodeId={node_id}");
                RegisterOutcome::Registered
            }
            Ok(resp) => {
                error!("registration rejected by authority: {}", resp.message);
                self.handle.mark_invalid(resp.message);
                RegisterOutcome::Rejected
            }
            Err(e) => {
                warn!("authority unreachable: {e}");
                RegisterOutcome::Unreachable
            }
        }
    }

    fn try_degrade_from_cache(&self) -> DegradeOutcome {
        let Some(cached) = self.cache.load() else {
            return DegradeOutcome::NoCache;
        };

        if self.is_expired(&cached.payload) {
            self.handle.mark_invalid("license code expired");
            error!("cached license is past its expiry, refusing degraded mode");
            return DegradeOutcome::Rejected;
        }

        self.tamper.set_last_verify_wall(cached.last_verify_time);
        self.tamper.mark_offline();
        if !self.tamper.is_degradation_valid() {
            self.handle
                .mark_invalid("clock anomaly detected or degraded grace exhausted");
            return DegradeOutcome::Rejected;
        }

        let remaining = self.tamper.remaining_grace_hours();
        self.handle.mark_degraded(
            Some(cached.payload),
            format!("running degraded from cache, {remaining} hours of grace remaining"),
        );
        self.handle.set_node_id(cached.node_id);
        warn!("degraded from local cache, {remaining} hours of grace remaining");
        DegradeOutcome::Degraded
    }

    async fn heartbeat_once(&self) {
        if let Some(node_id) = self.handle.node_id() {
            match self.client.heartbeat(&node_id).await {
                Ok(resp) if resp.is_ok() => {
                    self.tamper.record_online_verify();
                    self.fail_count.store(0, Ordering::SeqCst);
                    if self.handle.is_degraded() {
                        self.recover_from_degraded(&node_id);
                    }
                    return;
                }
                Ok(resp) if resp.code == 404 => {
                    warn!("authority no longer knows this node, re-registering");
                    if matches!(self.try_register().await, RegisterOutcome::Registered) {
                        return;
                    }
                }
                Ok(resp) => {
                    warn!("heartbeat rejected: code={}, message={}", resp.code, resp.message);
                }
                Err(e) => {
                    warn!("heartbeat failed: {e}");
                }
            }
        } else if matches!(self.try_register().await, RegisterOutcome::Registered) {
            return;
        }

        self.record_failure();
    }

    fn recover_from_degraded(&self, node_id: &str) {
        let Some(payload) = self.handle.payload() else {
            return;
        };
        if let Some(code) = self.license_code() {
            self.cache
                .save(&payload, Some(node_id), &code, self.clock.wall_ms());
        }
        self.handle.mark_online(
            payload,
            node_id.to_string(),
            "license valid (connection restored)",
        );
        info!("authority connection restored, leaving degraded mode");
    }

    fn record_failure(&self) {
        let failures = self.fail_count.fetch_add(1, Ordering::SeqCst) + 1;
        if failures < MAX_FAILURES_BEFORE_DEGRADE {
            return;
        }

        self.tamper.mark_offline();
        if self.tamper.is_degradation_valid() {
            // A handle that is already INVALID (the authority rejected us
            // outright) must not be resurrected by mere connectivity loss.
            if self.handle.is_valid() {
                let remaining = self.tamper.remaining_grace_hours();
                self.handle.mark_degraded(
                    None,
                    format!("running degraded, {remaining} hours of grace remaining"),
                );
                warn!(
                    "{failures} consecutive authority failures, degraded with {remaining} hours of grace"
                );
            }
        } else {
            self.handle.mark_invalid(
                "offline grace exhausted or clock anomaly detected, reconnect to the authority",
            );
            error!("degraded grace exhausted, license invalid");
        }
    }
}

fn load_pem_text(config: &AgentConfig) -> Result<Option<String>, String> {
    if let Some(pem) = config
        .public_key
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        return Ok(Some(pem.to_string()));
    }
    match &config.public_key_path {
        Some(path) => std::fs::read_to_string(path)
            .map(Some)
            .map_err(|e| format!("reading public key {} failed: {e}", path.display())),
        None => Ok(None),
    }
}
