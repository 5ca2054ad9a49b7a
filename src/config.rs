//! Environment variable overrides
//!
//! These optionally override settings from the config file (see the
//! config_file module). Command line flags take precedence over both.
//!
//! Environment variables (all optional):
//! - BREAKTIME_STALENESS_WINDOW: peer activity staleness window in seconds
//! - BREAKTIME_TICK_INTERVAL_MS: tick period in milliseconds

use crate::constants::{
    STALENESS_WINDOW_MAX_SECS, STALENESS_WINDOW_MIN_SECS, TICK_INTERVAL_MAX_MS,
    TICK_INTERVAL_MIN_MS,
};
use log::{debug, info, warn};
use std::env;

pub const STALENESS_WINDOW_VAR: &str = "BREAKTIME_STALENESS_WINDOW";
pub const TICK_INTERVAL_VAR: &str = "BREAKTIME_TICK_INTERVAL_MS";

fn parse_ranged(var: &str, min: u64, max: u64, unit: &str) -> Option<u64> {
    match env::var(var) {
        Ok(val) => match val.trim().parse::<u64>() {
            Ok(value) if (min..=max).contains(&value) => {
                info!("{} set via environment variable: {} {}", var, value, unit);
                Some(value)
            }
            Ok(value) => {
                warn!(
                    "Invalid {}: {} (must be {}-{} {}). Ignoring.",
                    var, value, min, max, unit
                );
                None
            }
            Err(e) => {
                warn!("Failed to parse {}: {}. Ignoring.", var, e);
                None
            }
        },
        Err(_) => {
            debug!("{} not set.", var);
            None
        }
    }
}

/// Parse the BREAKTIME_STALENESS_WINDOW environment variable
///
/// Returns Some(seconds) if set within range, None otherwise
pub fn parse_staleness_window() -> Option<u64> {
    parse_ranged(
        STALENESS_WINDOW_VAR,
        STALENESS_WINDOW_MIN_SECS,
        STALENESS_WINDOW_MAX_SECS,
        "seconds",
    )
}

/// Parse the BREAKTIME_TICK_INTERVAL_MS environment variable
///
/// Returns Some(milliseconds) if set within range, None otherwise
pub fn parse_tick_interval() -> Option<u64> {
    parse_ranged(
        TICK_INTERVAL_VAR,
        TICK_INTERVAL_MIN_MS,
        TICK_INTERVAL_MAX_MS,
        "ms",
    )
}
