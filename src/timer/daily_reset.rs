//! Time-of-day predicates used for daily timer resets

use crate::utils::time_of_day::TimeOfDay;
use chrono::{FixedOffset, Local, Offset, TimeZone, Utc};
use std::fmt;

/// A recurring point in time
pub trait TimePred: Send + Sync + fmt::Debug {
    /// First occurrence strictly after `after` (Unix seconds)
    fn next_after(&self, after: i64) -> Option<i64>;
}

/// Zone in which a [`DayTimePred`] interprets its time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayZone {
    Local,
    Fixed(FixedOffset),
}

/// Fires once a day at a fixed time of day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTimePred {
    at: TimeOfDay,
    zone: DayZone,
}

impl DayTimePred {
    /// Time of day in the system's local time zone
    pub fn local(at: TimeOfDay) -> Self {
        Self {
            at,
            zone: DayZone::Local,
        }
    }

    pub fn with_offset(at: TimeOfDay, offset: FixedOffset) -> Self {
        Self {
            at,
            zone: DayZone::Fixed(offset),
        }
    }

    pub fn utc(at: TimeOfDay) -> Self {
        Self::with_offset(at, Utc.fix())
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        self.at
    }

    pub fn zone(&self) -> DayZone {
        self.zone
    }
}

impl TimePred for DayTimePred {
    fn next_after(&self, after: i64) -> Option<i64> {
        match self.zone {
            DayZone::Local => next_in_zone(&Local, self.at, after),
            DayZone::Fixed(offset) => next_in_zone(&offset, self.at, after),
        }
    }
}

fn next_in_zone<Tz: TimeZone>(tz: &Tz, at: TimeOfDay, after: i64) -> Option<i64> {
    let mut date = tz.timestamp_opt(after, 0).single()?.date_naive();

    // A DST gap can swallow the time of day; try the following days
    for _ in 0..3 {
        let naive = date.and_hms_opt(at.hour, at.minute, 0)?;
        if let Some(candidate) = tz.from_local_datetime(&naive).earliest() {
            let ts = candidate.timestamp();
            if ts > after {
                return Some(ts);
            }
        }
        date = date.succ_opt()?;
    }
    None
}

/// Daily reset policy of a timer
#[derive(Debug, Default)]
pub enum DailyReset {
    /// No daily reset
    #[default]
    Never,
    /// Reset whenever the predicate's next occurrence has passed
    At(Box<dyn TimePred>),
}

impl DailyReset {
    pub fn at(pred: impl TimePred + 'static) -> Self {
        DailyReset::At(Box::new(pred))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, DailyReset::At(_))
    }

    pub fn next_after(&self, after: i64) -> Option<i64> {
        match self {
            DailyReset::Never => None,
            DailyReset::At(pred) => pred.next_after(after),
        }
    }
}
