//! Wall-clock seam for time-window computations.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now" in Unix epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

/// Index of the fixed-length window containing `now_ms`.
pub fn time_block(now_ms: i64, window_ms: i64) -> i64 {
    now_ms.div_euclid(window_ms.max(1))
}

/// Start of the window containing `now_ms`; entries at or before it are stale.
pub fn window_start(now_ms: i64, window_ms: i64) -> i64 {
    time_block(now_ms, window_ms) * window_ms.max(1)
}
