//! Online-node registry: register / heartbeat / unregister / sweep with
//! concurrency-cap enforcement and a durable snapshot.
//!
//! Every mutation runs under one async mutex and persists before the lock
//! is released; heartbeat only touches the in-memory timestamp. Recovery
//! re-filters by the heartbeat timeout, so the staleness a restart can
//! leak is bounded by `node_timeout_seconds`.

use crate::error::{ServerError, ServerResult};
use crate::persist;
use licgrid_token as token;
use licgrid_types::{now_ms, MachineInfo, NodeInfo};
use rsa::RsaPublicKey;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Operation counters and table sizes, as served by the stats endpoint.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub online_node_count: usize,
    pub register_count: u64,
    pub heartbeat_count: u64,
    pub unregister_count: u64,
    pub license_count: usize,
}

/// The node table and its reverse index. The index is rebuilt from the
/// table on load and never persisted, so the two cannot drift across a
/// restart; within a process they are only touched together, under the
/// registry mutex.
#[derive(Default)]
struct Tables {
    nodes: HashMap<String, NodeInfo>,
    by_license: HashMap<String, Vec<String>>,
}

impl Tables {
    fn insert(&mut self, node: NodeInfo) {
        self.by_license
            .entry(node.license_code.clone())
            .or_default()
            .push(node.node_id.clone());
        self.nodes.insert(node.node_id.clone(), node);
    }

    fn remove(&mut self, node_id: &str) -> Option<NodeInfo> {
        let node = self.nodes.remove(node_id)?;
        if let Some(ids) = self.by_license.get_mut(&node.license_code) {
            ids.retain(|id| id != node_id);
            if ids.is_empty() {
                self.by_license.remove(&node.license_code);
            }
        }
        Some(node)
    }

    /// Finds a live node under `license_code` whose fingerprint identifies
    /// the same machine.
    fn find_same_machine(&self, license_code: &str, machine: &MachineInfo) -> Option<String> {
        let ids = self.by_license.get(license_code)?;
        ids.iter()
            .find(|id| {
                self.nodes
                    .get(*id)
                    .is_some_and(|n| n.machine_info.same_machine(machine))
            })
            .cloned()
    }

    fn snapshot(&self) -> Vec<NodeInfo> {
        self.nodes.values().cloned().collect()
    }
}

/// The online-node registry.
pub struct NodeRegistry {
    tables: Mutex<Tables>,
    public_key: Option<RsaPublicKey>,
    timeout_ms: i64,
    persist_path: PathBuf,
    register_count: AtomicU64,
    heartbeat_count: AtomicU64,
    unregister_count: AtomicU64,
}

impl NodeRegistry {
    /// Creates the registry and recovers the persisted snapshot, dropping
    /// nodes whose last heartbeat is already past the timeout.
    pub async fn load(
        public_key: Option<RsaPublicKey>,
        node_timeout_seconds: u64,
        persist_path: PathBuf,
    ) -> Self {
        let registry = Self {
            tables: Mutex::new(Tables::default()),
            public_key,
            timeout_ms: node_timeout_seconds as i64 * 1000,
            persist_path,
            register_count: AtomicU64::new(0),
            heartbeat_count: AtomicU64::new(0),
            unregister_count: AtomicU64::new(0),
        };
        registry.recover().await;
        registry
    }

    async fn recover(&self) {
        let nodes: Vec<NodeInfo> = match persist::read_json(&self.persist_path).await {
            Ok(Some(nodes)) => nodes,
            Ok(None) => {
                info!(
                    "node snapshot {} not found, starting empty",
                    self.persist_path.display()
                );
                return;
            }
            Err(e) => {
                warn!(
                    "node snapshot {} unreadable, starting empty: {e}",
                    self.persist_path.display()
                );
                return;
            }
        };

        let now = now_ms();
        let mut tables = self.tables.lock().await;
        let mut kept = 0usize;
        let mut dropped = 0usize;
        for node in nodes {
            if now - node.last_heartbeat_time > self.timeout_ms {
                debug!("dropping stale node {} from snapshot", node.node_id);
                dropped += 1;
                continue;
            }
            tables.insert(node);
            kept += 1;
        }
        info!("node registry recovered: {kept} nodes kept, {dropped} stale dropped");

        if dropped > 0 {
            self.persist(&tables).await;
        }
    }

    /// Registers a machine under a license code and returns its node id.
    ///
    /// A machine already registered under the same code (per the identity
    /// predicate) reclaims its existing id instead of consuming a second
    /// slot, which is what makes client restarts safe.
    pub async fn register(
        &self,
        license_code: &str,
        machine: MachineInfo,
    ) -> ServerResult<String> {
        let Some(public_key) = &self.public_key else {
            return Err(ServerError::Config(
                "public key not configured, cannot verify license codes".to_string(),
            ));
        };
        let payload = token::verify(license_code, public_key)?;

        let now = now_ms();
        if payload.expiry_time.is_some_and(|t| now > t) {
            return Err(ServerError::Expired);
        }
        if payload.issued_time.is_some_and(|t| now < t) {
            return Err(ServerError::NotYetValid);
        }

        let mut tables = self.tables.lock().await;

        if let Some(existing_id) = tables.find_same_machine(license_code, &machine) {
            if let Some(node) = tables.nodes.get_mut(&existing_id) {
                node.last_heartbeat_time = now;
            }
            self.register_count.fetch_add(1, Ordering::Relaxed);
            self.persist(&tables).await;
            info!(
                "node re-registered: nodeId={existing_id}, hostname={:?}",
                machine.hostname
            );
            return Ok(existing_id);
        }

        let current = tables.by_license.get(license_code).map_or(0, Vec::len);
        if let Some(max) = payload.max_machine_count {
            if current >= max as usize {
                return Err(ServerError::Capacity { max, current });
            }
        }

        let node_id = Uuid::new_v4().simple().to_string();
        let hostname = machine.hostname.clone();
        tables.insert(NodeInfo {
            node_id: node_id.clone(),
            license_code: license_code.to_string(),
            machine_info: machine,
            register_time: now,
            last_heartbeat_time: now,
        });
        self.register_count.fetch_add(1, Ordering::Relaxed);
        self.persist(&tables).await;

        info!(
            "node registered: nodeId={node_id}, hostname={hostname:?}, online={}/{:?}",
            current + 1,
            payload.max_machine_count
        );
        Ok(node_id)
    }

    /// Refreshes a node's heartbeat. Returns false when the node is gone
    /// (swept or never registered) so the caller can re-register.
    ///
    /// Heartbeats are never persisted; recovery re-filters by timeout.
    pub async fn heartbeat(&self, node_id: &str) -> bool {
        let mut tables = self.tables.lock().await;
        match tables.nodes.get_mut(node_id) {
            Some(node) => {
                node.last_heartbeat_time = now_ms();
                self.heartbeat_count.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => {
                warn!("heartbeat for unknown node {node_id}");
                false
            }
        }
    }

    /// Removes a node. Unknown ids are a no-op.
    pub async fn unregister(&self, node_id: &str) {
        let mut tables = self.tables.lock().await;
        if let Some(node) = tables.remove(node_id) {
            self.unregister_count.fetch_add(1, Ordering::Relaxed);
            self.persist(&tables).await;
            info!(
                "node unregistered: nodeId={}, hostname={:?}",
                node.node_id, node.machine_info.hostname
            );
        }
    }

    /// Removes every node whose last heartbeat is older than the timeout.
    /// Returns the number of nodes swept.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(now_ms()).await
    }

    async fn sweep_at(&self, now: i64) -> usize {
        let mut tables = self.tables.lock().await;
        let stale: Vec<String> = tables
            .nodes
            .values()
            .filter(|n| now - n.last_heartbeat_time > self.timeout_ms)
            .map(|n| n.node_id.clone())
            .collect();

        if stale.is_empty() {
            return 0;
        }
        for node_id in &stale {
            tables.remove(node_id);
            self.unregister_count.fetch_add(1, Ordering::Relaxed);
        }
        self.persist(&tables).await;
        info!("sweep removed {} timed-out nodes", stale.len());
        stale.len()
    }

    /// All online nodes.
    pub async fn online_nodes(&self) -> Vec<NodeInfo> {
        self.tables.lock().await.snapshot()
    }

    /// Number of nodes online under one license code.
    pub async fn online_count(&self, license_code: &str) -> usize {
        self.tables
            .lock()
            .await
            .by_license
            .get(license_code)
            .map_or(0, Vec::len)
    }

    /// Operation counters and table sizes.
    pub async fn stats(&self) -> RegistryStats {
        let tables = self.tables.lock().await;
        RegistryStats {
            online_node_count: tables.nodes.len(),
            register_count: self.register_count.load(Ordering::Relaxed),
            heartbeat_count: self.heartbeat_count.load(Ordering::Relaxed),
            unregister_count: self.unregister_count.load(Ordering::Relaxed),
            license_count: tables.by_license.len(),
        }
    }

    /// Mirrors the node table to disk. Failures are logged; the in-memory
    /// mutation already committed.
    async fn persist(&self, tables: &Tables) {
        if let Err(e) = persist::write_json_atomic(&self.persist_path, &tables.snapshot()).await {
            error!(
                "persisting node registry to {} failed: {e}",
                self.persist_path.display()
            );
        }
    }
}
