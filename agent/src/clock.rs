//! Clock abstraction for the agent.
//!
//! Wall time produces timestamps the authority can compare; monotonic
//! time measures offline duration in a way that editing the system clock
//! cannot stretch. Tests steer both independently through [`MockClock`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Time source for the agent.
pub trait Clock: Send + Sync {
    /// Wall clock, epoch milliseconds.
    fn wall_ms(&self) -> i64;
    /// Monotonic clock, nanoseconds since an arbitrary origin. Never goes
    /// backwards within one process; resets on restart.
    fn mono_ns(&self) -> i64;
}

/// The real clocks.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn wall_ms(&self) -> i64 {
        licgrid_types::now_ms()
    }

    fn mono_ns(&self) -> i64 {
        self.origin.elapsed().as_nanos() as i64
    }
}

/// Steerable clock for deterministic tests. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    wall_ms: i64,
    mono_ns: i64,
}

impl MockClock {
    /// A mock clock frozen at the given wall time.
    #[must_use]
    pub fn at(wall_ms: i64) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState { wall_ms, mono_ns: 0 })),
        }
    }

    /// Advances wall and monotonic time together (time passing normally).
    pub fn advance_ms(&self, ms: i64) {
        let mut state = self.lock();
        state.wall_ms += ms;
        state.mono_ns += ms * 1_000_000;
    }

    /// Moves only the wall clock (an operator editing the system time).
    /// Negative values jump backwards.
    pub fn shift_wall_ms(&self, ms: i64) {
        self.lock().wall_ms += ms;
    }

    /// Advances only the monotonic clock.
    pub fn advance_mono_ns(&self, ns: i64) {
        self.lock().mono_ns += ns;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for MockClock {
    fn wall_ms(&self) -> i64 {
        self.lock().wall_ms
    }

    fn mono_ns(&self) -> i64 {
        self.lock().mono_ns
    }
}
