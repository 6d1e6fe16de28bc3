//! Machine fingerprint data and the identity predicate the authority
//! uses to recognize re-registrations.

use serde::{Deserialize, Serialize};

/// Fingerprint of one machine running a licensed application.
///
/// Every field is optional because collection is best-effort and platform
/// dependent; a fingerprint with nothing but a hostname is still accepted,
/// it is just a weaker identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineInfo {
    /// IP addresses, loopback excluded.
    pub ip_address: Option<Vec<String>>,
    /// MAC addresses of physical interfaces, `AA-BB-...` uppercase.
    pub mac_address: Option<Vec<String>>,
    /// OS machine id (`/etc/machine-id` on Linux).
    pub machine_id: Option<String>,
    /// DMI system UUID.
    pub system_uuid: Option<String>,
    /// Hostname.
    pub hostname: Option<String>,
}

impl MachineInfo {
    /// Decides whether two fingerprints identify the same machine.
    ///
    /// `machine_id` equality wins whenever both sides carry one. Otherwise
    /// any shared MAC address counts; MAC overlap is a deliberately weak
    /// signal (a docked laptop can shift its interface list), which is why
    /// the collector tries hard to supply a `machine_id`.
    #[must_use]
    pub fn same_machine(&self, other: &MachineInfo) -> bool {
        if let (Some(a), Some(b)) = (&self.machine_id, &other.machine_id) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.mac_address, &other.mac_address) {
            return a.iter().any(|mac| b.contains(mac));
        }
        false
    }
}
