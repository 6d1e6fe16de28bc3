//! Anti-tamper guard for offline grace accounting.
//!
//! Two clocks back the guard. The monotonic clock measures the real
//! offline duration, so advancing the system time cannot stretch the
//! grace budget. The wall clock exposes rollback: wall time earlier than
//! the last successful verification means someone moved the clock
//! backwards, which is treated as an attack. The monotonic origin resets
//! on restart, so a restarted process must re-register, and the authority
//! re-checks the validity window at that point anyway.

use crate::clock::Clock;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{error, warn};

const NANOS_PER_HOUR: i64 = 3_600_000_000_000;

/// Wall-vs-monotonic divergence tolerated before a warning. Covers NTP
/// corrections.
const DRIFT_TOLERANCE_MS: i64 = 5 * 60 * 1000;

/// Sentinel for "not offline".
const NOT_OFFLINE: i64 = -1;

/// Tracks verification times and the offline stopwatch.
pub struct TamperGuard {
    clock: Arc<dyn Clock>,
    /// Wall time of the last successful online verification (ms).
    last_verify_wall: AtomicI64,
    /// Monotonic time of the last successful online verification (ns).
    last_verify_mono: AtomicI64,
    /// Monotonic time offline began (ns), `NOT_OFFLINE` while online.
    offline_start_mono: AtomicI64,
    grace_nanos: i64,
}

impl TamperGuard {
    /// Creates a guard with the given grace budget.
    #[must_use]
    pub fn new(grace_period_hours: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            last_verify_wall: AtomicI64::new(clock.wall_ms()),
            last_verify_mono: AtomicI64::new(clock.mono_ns()),
            offline_start_mono: AtomicI64::new(NOT_OFFLINE),
            grace_nanos: grace_period_hours as i64 * NANOS_PER_HOUR,
            clock,
        }
    }

    /// Records a successful round-trip to the authority and resets the
    /// offline stopwatch.
    pub fn record_online_verify(&self) {
        self.last_verify_wall
            .store(self.clock.wall_ms(), Ordering::SeqCst);
        self.last_verify_mono
            .store(self.clock.mono_ns(), Ordering::SeqCst);
        self.offline_start_mono.store(NOT_OFFLINE, Ordering::SeqCst);
    }

    /// Starts the offline stopwatch. Idempotent.
    pub fn mark_offline(&self) {
        if self.offline_start_mono.load(Ordering::SeqCst) < 0 {
            self.offline_start_mono
                .store(self.clock.mono_ns(), Ordering::SeqCst);
            warn!(
                "entering offline mode, grace budget {} hours",
                self.grace_nanos / NANOS_PER_HOUR
            );
        }
    }

    /// Adopts a persisted verification wall time (cache-based degrade).
    pub fn set_last_verify_wall(&self, wall_ms: i64) {
        self.last_verify_wall.store(wall_ms, Ordering::SeqCst);
    }

    /// Whether degraded operation is still permitted.
    pub fn is_degradation_valid(&self) -> bool {
        let wall_now = self.clock.wall_ms();
        let last_wall = self.last_verify_wall.load(Ordering::SeqCst);
        if wall_now < last_wall {
            error!(
                "wall clock moved back {} ms past the last verification, rejecting degraded mode",
                last_wall - wall_now
            );
            return false;
        }

        let offline_start = self.offline_start_mono.load(Ordering::SeqCst);
        if offline_start < 0 {
            return true;
        }

        let mono_now = self.clock.mono_ns();
        if mono_now - offline_start > self.grace_nanos {
            error!(
                "offline for {} hours, grace budget exhausted",
                (mono_now - offline_start) / NANOS_PER_HOUR
            );
            return false;
        }

        // Wall running far ahead of monotonic could be forward tampering,
        // but NTP corrections look the same; warn without failing.
        let wall_elapsed_ms = wall_now - last_wall;
        let mono_elapsed_ms = (mono_now - self.last_verify_mono.load(Ordering::SeqCst)) / 1_000_000;
        if wall_elapsed_ms - mono_elapsed_ms > DRIFT_TOLERANCE_MS {
            warn!(
                "wall clock ran {} ms ahead of the monotonic clock since the last verification",
                wall_elapsed_ms - mono_elapsed_ms
            );
        }

        true
    }

    /// Whole hours of grace remaining.
    #[must_use]
    pub fn remaining_grace_hours(&self) -> i64 {
        let offline_start = self.offline_start_mono.load(Ordering::SeqCst);
        if offline_start < 0 {
            return self.grace_nanos / NANOS_PER_HOUR;
        }
        let elapsed = self.clock.mono_ns() - offline_start;
        ((self.grace_nanos - elapsed) / NANOS_PER_HOUR).max(0)
    }
}
