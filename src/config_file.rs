//! Configuration file management
//!
//! This module handles loading and saving `config.toml`, which holds the
//! activity monitor settings and the list of break timers.

use crate::activity::InputThresholds;
use crate::constants::{
    ACTIVITY_THRESHOLD_DEFAULT_MS, DAILY_LIMIT_LIMIT_SECS, DAILY_LIMIT_RESET_AT,
    DAILY_LIMIT_SNOOZE_SECS, IDLE_THRESHOLD_DEFAULT_MS, MICRO_PAUSE_AUTO_RESET_SECS,
    MICRO_PAUSE_LIMIT_SECS, MICRO_PAUSE_SNOOZE_SECS, NOISE_THRESHOLD_DEFAULT_MS,
    REST_BREAK_AUTO_RESET_SECS, REST_BREAK_LIMIT_SECS, REST_BREAK_SNOOZE_SECS,
    STALENESS_WINDOW_DEFAULT_SECS, STALENESS_WINDOW_MAX_SECS, STALENESS_WINDOW_MIN_SECS,
};
use crate::time_source::TimeSource;
use crate::timer::daily_reset::{DailyReset, DayTimePred};
use crate::timer::Timer;
use crate::utils::time_of_day::parse_time_of_day;
use anyhow::{anyhow, bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application configuration stored in config.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default = "default_timers")]
    pub timers: Vec<TimerConfig>,
}

/// `[monitor]` section
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Maximum age of a peer activity report in seconds (default: 10)
    pub staleness_window_secs: u64,
    /// Continuous input before local activity is recognized, in ms (default: 1000)
    pub activity_threshold_ms: u64,
    /// Silence before local activity turns idle, in ms (default: 5000)
    pub idle_threshold_ms: u64,
    /// Silence before isolated input is discarded, in ms (default: 9000)
    pub noise_threshold_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            staleness_window_secs: STALENESS_WINDOW_DEFAULT_SECS,
            activity_threshold_ms: ACTIVITY_THRESHOLD_DEFAULT_MS,
            idle_threshold_ms: IDLE_THRESHOLD_DEFAULT_MS,
            noise_threshold_ms: NOISE_THRESHOLD_DEFAULT_MS,
        }
    }
}

impl MonitorConfig {
    pub fn input_thresholds(&self) -> InputThresholds {
        InputThresholds {
            activity_ms: self.activity_threshold_ms,
            idle_ms: self.idle_threshold_ms,
            noise_ms: self.noise_threshold_ms,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(STALENESS_WINDOW_MIN_SECS..=STALENESS_WINDOW_MAX_SECS)
            .contains(&self.staleness_window_secs)
        {
            bail!(
                "staleness_window_secs must be {}-{} (got {})",
                STALENESS_WINDOW_MIN_SECS,
                STALENESS_WINDOW_MAX_SECS,
                self.staleness_window_secs
            );
        }
        self.input_thresholds()
            .validate()
            .context("Invalid input thresholds in [monitor]")
    }
}

fn enabled_by_default() -> bool {
    true
}

/// One `[[timers]]` entry; all durations in seconds
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Unique id, also the key in the state file
    pub id: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub limit: i64,
    #[serde(default = "enabled_by_default")]
    pub limit_enabled: bool,
    #[serde(default)]
    pub auto_reset: i64,
    #[serde(default = "enabled_by_default")]
    pub auto_reset_enabled: bool,
    pub snooze: i64,
    /// Local time of day ("HH:MM") at which the timer resets every day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_reset: Option<String>,
}

impl TimerConfig {
    pub fn micro_pause() -> Self {
        Self {
            id: "micro_pause".to_string(),
            enabled: true,
            limit: MICRO_PAUSE_LIMIT_SECS,
            limit_enabled: true,
            auto_reset: MICRO_PAUSE_AUTO_RESET_SECS,
            auto_reset_enabled: true,
            snooze: MICRO_PAUSE_SNOOZE_SECS,
            daily_reset: None,
        }
    }

    pub fn rest_break() -> Self {
        Self {
            id: "rest_break".to_string(),
            enabled: true,
            limit: REST_BREAK_LIMIT_SECS,
            limit_enabled: true,
            auto_reset: REST_BREAK_AUTO_RESET_SECS,
            auto_reset_enabled: true,
            snooze: REST_BREAK_SNOOZE_SECS,
            daily_reset: None,
        }
    }

    pub fn daily_limit() -> Self {
        Self {
            id: "daily_limit".to_string(),
            enabled: true,
            limit: DAILY_LIMIT_LIMIT_SECS,
            limit_enabled: true,
            auto_reset: 0,
            auto_reset_enabled: false,
            snooze: DAILY_LIMIT_SNOOZE_SECS,
            daily_reset: Some(DAILY_LIMIT_RESET_AT.to_string()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            bail!("Timer id must not be empty");
        }
        if !self
            .id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!(
                "Timer id '{}' may only contain letters, digits, '_' and '-'",
                self.id
            );
        }
        for (name, value) in [
            ("limit", self.limit),
            ("auto_reset", self.auto_reset),
            ("snooze", self.snooze),
        ] {
            if value < 0 {
                bail!("Timer '{}': {} must not be negative ({})", self.id, name, value);
            }
        }
        if let Some(ref at) = self.daily_reset {
            parse_time_of_day(at)
                .with_context(|| format!("Timer '{}': invalid daily_reset '{}'", self.id, at))?;
        }
        Ok(())
    }

    fn daily_reset_policy(&self) -> Result<DailyReset> {
        match self.daily_reset {
            Some(ref at) => {
                let time = parse_time_of_day(at)?;
                Ok(DailyReset::at(DayTimePred::local(time)))
            }
            None => Ok(DailyReset::Never),
        }
    }

    /// Construct a timer with this policy, enabled if configured so
    pub fn build_timer(&self, clock: Arc<dyn TimeSource>) -> Result<Timer> {
        let mut timer = Timer::new(self.id.clone(), clock);
        timer.set_limit(self.limit);
        timer.set_limit_enabled(self.limit_enabled);
        timer.set_auto_reset(self.auto_reset);
        timer.set_auto_reset_enabled(self.auto_reset_enabled);
        timer.set_snooze(self.snooze);
        timer.set_daily_reset(
            self.daily_reset_policy()
                .with_context(|| format!("Timer '{}'", self.id))?,
        );
        if self.enabled {
            timer.enable();
        }
        Ok(timer)
    }
}

fn default_timers() -> Vec<TimerConfig> {
    vec![
        TimerConfig::micro_pause(),
        TimerConfig::rest_break(),
        TimerConfig::daily_limit(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            timers: default_timers(),
        }
    }
}

impl Config {
    /// Get the standard config file path
    ///
    /// - macOS: `~/Library/Application Support/breaktime/config.toml`
    /// - Linux: `~/.config/breaktime/config.toml`
    /// - Windows: `%APPDATA%\breaktime\config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Failed to determine config directory"))?
            .join("breaktime");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from standard location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load config from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Config file doesn't exist
    /// - Failed to read file
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "Configuration file not found at: {}\n\nRun 'breaktime --setup' to create it.",
                path.display()
            );
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from `path`, falling back to the defaults if it doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            info!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Save config to standard location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to_path(&path)
    }

    /// Save config to a specific path, creating the parent directory if needed
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        self.validate().context("Refusing to save invalid config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.monitor.validate()?;

        let mut seen = HashSet::new();
        for timer in &self.timers {
            timer.validate()?;
            if !seen.insert(timer.id.as_str()) {
                bail!("Duplicate timer id '{}'", timer.id);
            }
        }
        Ok(())
    }

    pub fn timer(&self, id: &str) -> Option<&TimerConfig> {
        self.timers.iter().find(|t| t.id == id)
    }
}
