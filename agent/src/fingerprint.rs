//! Best-effort machine fingerprint collection.
//!
//! Every probe is optional; a machine with no readable identifiers still
//! produces a usable (if weak) fingerprint. Identity comparison always
//! prefers `machine_id` over MAC overlap, so the collector tries hardest
//! to supply one. Non-Linux targets degrade to hostname-only.

use licgrid_types::MachineInfo;
use std::net::UdpSocket;

/// Collects the local machine's fingerprint.
#[must_use]
pub fn collect() -> MachineInfo {
    MachineInfo {
        ip_address: primary_ip().map(|ip| vec![ip]),
        mac_address: mac_addresses(),
        machine_id: machine_id(),
        system_uuid: system_uuid(),
        hostname: hostname(),
    }
}

fn hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}

/// The local address of a connected UDP socket is the interface address
/// the OS would route outbound traffic through. No packet is sent.
fn primary_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let addr = socket.local_addr().ok()?;
    Some(addr.ip().to_string())
}

#[cfg(target_os = "linux")]
fn machine_id() -> Option<String> {
    std::fs::read_to_string("/etc/machine-id")
        .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(not(target_os = "linux"))]
fn machine_id() -> Option<String> {
    None
}

#[cfg(target_os = "linux")]
fn system_uuid() -> Option<String> {
    std::fs::read_to_string("/sys/class/dmi/id/product_uuid")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(not(target_os = "linux"))]
fn system_uuid() -> Option<String> {
    None
}

#[cfg(target_os = "linux")]
fn mac_addresses() -> Option<Vec<String>> {
    let entries = std::fs::read_dir("/sys/class/net").ok()?;
    let mut macs = Vec::new();
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy() == "lo" {
            continue;
        }
        let Ok(raw) = std::fs::read_to_string(entry.path().join("address")) else {
            continue;
        };
        let mac = raw.trim().to_uppercase().replace(':', "-");
        // Virtual interfaces report all-zero addresses.
        if mac.is_empty() || mac.chars().all(|c| c == '0' || c == '-') {
            continue;
        }
        if !macs.contains(&mac) {
            macs.push(mac);
        }
    }
    if macs.is_empty() {
        None
    } else {
        Some(macs)
    }
}

#[cfg(not(target_os = "linux"))]
fn mac_addresses() -> Option<Vec<String>> {
    None
}
