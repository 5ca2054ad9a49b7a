//! User activity detection
//!
//! The [`ActivityMonitor`] resolves one [`ActivityState`] per tick from a
//! [`LocalActivitySource`] and from activity reported by peer instances.
//! [`InputActivityTracker`] is a platform-free local source fed by an
//! external input hook.

pub mod input_tracker;
pub mod monitor;

pub use input_tracker::{InputActivityTracker, InputThresholds};
pub use monitor::ActivityMonitor;

use anyhow::Result;
use std::fmt;

/// Resolved user presence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    Unknown,
    Suspended,
    Idle,
    Active,
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityState::Unknown => "unknown",
            ActivityState::Suspended => "suspended",
            ActivityState::Idle => "idle",
            ActivityState::Active => "active",
        };
        f.write_str(name)
    }
}

/// Receives activity state changes from the monitor
///
/// Returning `false` unsubscribes the listener.
pub trait ActivityListener: Send {
    fn action_notify(&mut self, state: ActivityState) -> bool;
}

impl<F> ActivityListener for F
where
    F: FnMut(ActivityState) -> bool + Send,
{
    fn action_notify(&mut self, state: ActivityState) -> bool {
        self(state)
    }
}

/// Platform backend reporting whether the user is active on this machine
pub trait LocalActivitySource: Send {
    /// Attach to the detection context identified by `display`
    fn init(&mut self, display: &str) -> Result<()>;

    fn terminate(&mut self) {}

    /// Current local activity, evaluated once per heartbeat
    fn is_active(&mut self) -> bool;

    /// Discard any activity collected so far
    fn force_idle(&mut self) {}
}
