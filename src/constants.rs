//! Centralized constants for the breaktime core
//!
//! This module contains all configurable numerical values used throughout
//! the crate. Each constant includes documentation on its purpose,
//! unit, and recommended value range.

// ============================================================================
// TICK DRIVER
// ============================================================================

/// Nominal period between two ticks (heartbeat + timer processing).
/// Unit: milliseconds
/// Recommended range: 250-2000 (accounting uses wall-clock deltas, so drift is absorbed)
pub const TICK_INTERVAL_DEFAULT_MS: u64 = 1000;

/// Minimum tick period accepted from the environment or command line.
/// Unit: milliseconds
pub const TICK_INTERVAL_MIN_MS: u64 = 100;

/// Maximum tick period accepted from the environment or command line.
/// Unit: milliseconds
pub const TICK_INTERVAL_MAX_MS: u64 = 10_000;

/// Number of ticks between two state checkpoints written by the binary.
/// Unit: ticks
/// Recommended range: 30-300
pub const STATE_CHECKPOINT_TICKS: u64 = 60;

// ============================================================================
// ACTIVITY MONITOR
// ============================================================================

/// Maximum age of an external (peer) activity report still counted as current.
/// Unit: seconds
/// Recommended range: 5-30 (must exceed the peers' reporting period)
pub const STALENESS_WINDOW_DEFAULT_SECS: u64 = 10;

/// Minimum staleness window.
/// Unit: seconds
pub const STALENESS_WINDOW_MIN_SECS: u64 = 1;

/// Maximum staleness window.
/// Unit: seconds
pub const STALENESS_WINDOW_MAX_SECS: u64 = 300;

// ============================================================================
// LOCAL INPUT FILTER
// ============================================================================

/// Continuous input required before local noise is promoted to activity.
/// Unit: milliseconds (0 = every input is activity)
/// Recommended range: 0-2000
pub const ACTIVITY_THRESHOLD_DEFAULT_MS: u64 = 1000;

/// Silence after which local activity is considered idle again.
/// Unit: milliseconds
/// Recommended range: 2000-10000
pub const IDLE_THRESHOLD_DEFAULT_MS: u64 = 5000;

/// Silence after which isolated input (noise) is discarded.
/// Unit: milliseconds
/// Recommended range: 1000-15000
pub const NOISE_THRESHOLD_DEFAULT_MS: u64 = 9000;

/// Upper bound for any local input threshold.
/// Unit: milliseconds
pub const INPUT_THRESHOLD_MAX_MS: u64 = 60_000;

// ============================================================================
// TIMER DEFAULTS
// ============================================================================

/// Snooze interval of a freshly constructed timer.
/// Unit: seconds
pub const TIMER_SNOOZE_DEFAULT_SECS: i64 = 60;

/// Limit of a freshly constructed timer.
/// Unit: seconds
pub const TIMER_LIMIT_DEFAULT_SECS: i64 = 600;

/// Auto-reset interval of a freshly constructed timer.
/// Unit: seconds
pub const TIMER_AUTO_RESET_DEFAULT_SECS: i64 = 120;

/// Micro-pause: short, frequent breaks.
/// Unit: seconds
pub const MICRO_PAUSE_LIMIT_SECS: i64 = 180;
pub const MICRO_PAUSE_AUTO_RESET_SECS: i64 = 30;
pub const MICRO_PAUSE_SNOOZE_SECS: i64 = 150;

/// Rest break: longer breaks every 45 minutes.
/// Unit: seconds
pub const REST_BREAK_LIMIT_SECS: i64 = 2700;
pub const REST_BREAK_AUTO_RESET_SECS: i64 = 600;
pub const REST_BREAK_SNOOZE_SECS: i64 = 180;

/// Daily limit: total computer time per day, reset at a time of day.
/// Unit: seconds
pub const DAILY_LIMIT_LIMIT_SECS: i64 = 14_400;
pub const DAILY_LIMIT_SNOOZE_SECS: i64 = 1200;

/// Time of day at which the daily limit is reset.
/// Unit: "HH:MM", local time
pub const DAILY_LIMIT_RESET_AT: &str = "00:00";

// ============================================================================
// PERSISTED STATE
// ============================================================================

/// Current timer state record format version.
/// Range: 1-3 are readable, 3 is written
pub const TIMER_STATE_VERSION: u32 = 3;

/// Oldest timer state record format version still accepted.
pub const TIMER_STATE_MIN_VERSION: u32 = 1;

/// First token of the state file header line.
pub const STATE_FILE_MAGIC: &str = "BreakTimeState";
