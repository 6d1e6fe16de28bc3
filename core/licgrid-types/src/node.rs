//! Node registration records.

use crate::machine::MachineInfo;
use serde::{Deserialize, Serialize};

/// One registered instance of a licensed application.
///
/// Created by the authority on a successful registration; only
/// `last_heartbeat_time` is ever mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Authority-assigned opaque id (32 hex chars).
    pub node_id: String,
    /// License code the node registered under.
    pub license_code: String,
    /// Fingerprint reported at registration.
    pub machine_info: MachineInfo,
    /// Registration wall time, epoch milliseconds.
    pub register_time: i64,
    /// Last heartbeat wall time, epoch milliseconds.
    pub last_heartbeat_time: i64,
}
