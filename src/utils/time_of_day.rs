use anyhow::{anyhow, Result};

/// A wall-clock time of day with minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 {
            return Err(anyhow!("Hour must be 0-23, got {}", hour));
        }
        if minute > 59 {
            return Err(anyhow!("Minute must be 0-59, got {}", minute));
        }
        Ok(Self { hour, minute })
    }

    pub fn midnight() -> Self {
        Self { hour: 0, minute: 0 }
    }

    /// Minutes since midnight
    pub fn minutes(&self) -> u32 {
        self.hour * 60 + self.minute
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_time_of_day(s)
    }
}

/// Parse an `HH:MM` (or `H:MM`) string
pub fn parse_time_of_day(s: &str) -> Result<TimeOfDay> {
    let s = s.trim();
    let (hour, minute) = s
        .split_once(':')
        .ok_or_else(|| anyhow!("Time of day must look like HH:MM, got '{}'", s))?;

    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return Err(anyhow!("Time of day must look like HH:MM, got '{}'", s));
    }
    if !hour.chars().chain(minute.chars()).all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("Time of day must be numeric, got '{}'", s));
    }

    // Digits only, at most two each: parse cannot fail
    let hour: u32 = hour.parse()?;
    let minute: u32 = minute.parse()?;
    TimeOfDay::new(hour, minute)
}
