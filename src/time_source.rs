//! Clock abstraction shared by the activity monitor and the timers
//!
//! Timers account in wall-clock seconds, the activity monitor ages external
//! reports in monotonic milliseconds. Both read time exclusively through a
//! [`TimeSource`] so that a host (or a test) can substitute its own clock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub trait TimeSource: Send + Sync + std::fmt::Debug {
    /// Wall-clock time in seconds since the Unix epoch
    fn real_time_secs(&self) -> i64;

    /// Monotonic time in milliseconds from an arbitrary origin
    fn monotonic_millis(&self) -> i64;
}

/// Clock backed by the operating system
#[derive(Debug, Clone)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn real_time_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn monotonic_millis(&self) -> i64 {
        self.origin.elapsed().as_millis() as i64
    }
}

/// Manually driven clock
///
/// Both views advance together: `real_time_secs()` is the millisecond
/// counter divided by 1000. Used by tests and by simulations that replay
/// recorded activity.
#[derive(Debug)]
pub struct ManualTimeSource {
    millis: AtomicI64,
}

impl ManualTimeSource {
    /// Start the clock at the given Unix time (seconds)
    pub fn new(start_secs: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_secs * 1000),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.millis.fetch_add(secs * 1000, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set_secs(&self, secs: i64) {
        self.millis.store(secs * 1000, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn real_time_secs(&self) -> i64 {
        self.millis.load(Ordering::SeqCst).div_euclid(1000)
    }

    fn monotonic_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}
