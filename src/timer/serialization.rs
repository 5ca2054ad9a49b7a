//! Persisted timer state records
//!
//! A record is a single line of whitespace-separated fields. The layout
//! depends on the format version the record was written with:
//!
//! | version | fields |
//! |---------|--------|
//! | 1 | `save_time elapsed last_reset` |
//! | 2 | `save_time state elapsed idle last_start last_stop last_reset` |
//! | 3 | `save_time state elapsed idle last_start last_stop last_reset overdue` |
//!
//! Fields missing from older versions default to zero. A version 1 record
//! carries no state, so the timer is restored as stopped at its save time.

use super::TimerState;
use crate::constants::{TIMER_STATE_MIN_VERSION, TIMER_STATE_VERSION};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateParseError {
    #[error("unsupported state format version {0}")]
    UnsupportedVersion(u32),
    #[error("version {version} records have {expected} fields, found {found}")]
    FieldCount {
        version: u32,
        expected: usize,
        found: usize,
    },
    #[error("field '{field}' is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field '{0}' must not be negative")]
    Negative(&'static str),
    #[error("unknown timer state '{0}'")]
    UnknownState(String),
}

/// Decoded contents of a timer state record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// Wall-clock time the record was written
    pub save_time: i64,
    pub state: TimerState,
    pub elapsed: i64,
    pub idle: i64,
    pub last_start: i64,
    pub last_stop: i64,
    pub last_reset: i64,
    pub overdue: i64,
}

fn field_count(version: u32) -> Result<usize, StateParseError> {
    match version {
        1 => Ok(3),
        2 => Ok(7),
        3 => Ok(8),
        v => Err(StateParseError::UnsupportedVersion(v)),
    }
}

fn number(field: &'static str, value: &str) -> Result<i64, StateParseError> {
    let n: i64 = value.parse().map_err(|_| StateParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })?;
    if n < 0 {
        return Err(StateParseError::Negative(field));
    }
    Ok(n)
}

impl TimerSnapshot {
    /// Encode in the current format version
    pub fn encode(&self) -> String {
        format!(
            "{} {} {} {} {} {} {} {}",
            self.save_time,
            self.state.as_str(),
            self.elapsed,
            self.idle,
            self.last_start,
            self.last_stop,
            self.last_reset,
            self.overdue
        )
    }

    /// Decode a record written with the given format version
    pub fn decode(record: &str, version: u32) -> Result<Self, StateParseError> {
        if !(TIMER_STATE_MIN_VERSION..=TIMER_STATE_VERSION).contains(&version) {
            return Err(StateParseError::UnsupportedVersion(version));
        }

        let fields: Vec<&str> = record.split_whitespace().collect();
        let expected = field_count(version)?;
        if fields.len() != expected {
            return Err(StateParseError::FieldCount {
                version,
                expected,
                found: fields.len(),
            });
        }

        if version == 1 {
            let save_time = number("save_time", fields[0])?;
            return Ok(Self {
                save_time,
                state: TimerState::Stopped,
                elapsed: number("elapsed", fields[1])?,
                idle: 0,
                last_start: 0,
                last_stop: save_time,
                last_reset: number("last_reset", fields[2])?,
                overdue: 0,
            });
        }

        let state = fields[1]
            .parse::<TimerState>()
            .map_err(|_| StateParseError::UnknownState(fields[1].to_string()))?;

        Ok(Self {
            save_time: number("save_time", fields[0])?,
            state,
            elapsed: number("elapsed", fields[2])?,
            idle: number("idle", fields[3])?,
            last_start: number("last_start", fields[4])?,
            last_stop: number("last_stop", fields[5])?,
            last_reset: number("last_reset", fields[6])?,
            overdue: if version >= 3 {
                number("overdue", fields[7])?
            } else {
                0
            },
        })
    }
}
