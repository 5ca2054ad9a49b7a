//! Persisted timer state
//!
//! The state file is plain text. The first line is a header naming the
//! record format version, followed by one line per timer:
//!
//! ```text
//! BreakTimeState 3
//! micro_pause 1700000000 stopped 120 40 1699999800 1699999920 1699999000 0
//! rest_break 1700000000 running 900 40 1699999800 1699999700 1699998000 0
//! ```

use crate::constants::{STATE_FILE_MAGIC, TIMER_STATE_MIN_VERSION, TIMER_STATE_VERSION};
use crate::timer::Timer;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Timer state records keyed by timer id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerStateStore {
    version: u32,
    records: BTreeMap<String, String>,
}

impl Default for TimerStateStore {
    fn default() -> Self {
        Self {
            version: TIMER_STATE_VERSION,
            records: BTreeMap::new(),
        }
    }
}

impl TimerStateStore {
    /// Snapshot the current state of `timers`
    pub fn from_timers<'a>(timers: impl IntoIterator<Item = &'a Timer>) -> Self {
        let records = timers
            .into_iter()
            .map(|timer| (timer.get_id().to_string(), timer.serialize_state()))
            .collect();
        Self {
            version: TIMER_STATE_VERSION,
            records,
        }
    }

    /// Get the standard state file path
    ///
    /// - macOS: `~/Library/Application Support/breaktime/state`
    /// - Linux: `~/.local/share/breaktime/state`
    /// - Windows: `%APPDATA%\breaktime\state`
    pub fn state_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Failed to determine data directory"))?
            .join("breaktime");
        Ok(data_dir.join("state"))
    }

    /// Parse the contents of a state file
    ///
    /// A bad header is an error; malformed timer lines are skipped.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut lines = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        let header = lines.next().ok_or_else(|| anyhow!("State file is empty"))?;
        let version = match header.split_whitespace().collect::<Vec<_>>().as_slice() {
            [magic, version] if *magic == STATE_FILE_MAGIC => version
                .parse::<u32>()
                .with_context(|| format!("Invalid state file version '{}'", version))?,
            _ => bail!("Not a state file (header '{}')", header),
        };
        if !(TIMER_STATE_MIN_VERSION..=TIMER_STATE_VERSION).contains(&version) {
            bail!(
                "Unsupported state file version {} (supported {}-{})",
                version,
                TIMER_STATE_MIN_VERSION,
                TIMER_STATE_VERSION
            );
        }

        let mut records = BTreeMap::new();
        for line in lines {
            match line.split_once(char::is_whitespace) {
                Some((id, record)) if !record.trim().is_empty() => {
                    records.insert(id.to_string(), record.trim().to_string());
                }
                _ => warn!("Skipping malformed state line: '{}'", line),
            }
        }

        Ok(Self { version, records })
    }

    /// Load state from a specific path; a missing file yields an empty store
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No saved timer state at {}", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))
    }

    /// Render the store in the state file format
    pub fn to_text(&self) -> String {
        let mut out = format!("{} {}\n", STATE_FILE_MAGIC, self.version);
        for (id, record) in &self.records {
            let _ = writeln!(out, "{} {}", id, record);
        }
        out
    }

    /// Write the store to `path` atomically (temporary file + rename)
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create state directory")?;
        }

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, self.to_text())
            .with_context(|| format!("Failed to write state file: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        info!(
            "Saved state of {} timer(s) to {}",
            self.records.len(),
            path.display()
        );
        Ok(())
    }

    /// Restore the saved record of `timer`, if any
    ///
    /// Returns true if a record was found and accepted.
    pub fn restore_into(&self, timer: &mut Timer) -> bool {
        match self.records.get(timer.get_id()) {
            Some(record) => timer.deserialize_state(record, self.version),
            None => {
                debug!("No saved state for timer '{}'", timer.get_id());
                false
            }
        }
    }

    pub fn record(&self, id: &str) -> Option<&str> {
        self.records.get(id).map(String::as_str)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}
