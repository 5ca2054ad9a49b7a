use super::LocalActivitySource;
use crate::constants::{
    ACTIVITY_THRESHOLD_DEFAULT_MS, IDLE_THRESHOLD_DEFAULT_MS, INPUT_THRESHOLD_MAX_MS,
    NOISE_THRESHOLD_DEFAULT_MS,
};
use crate::time_source::TimeSource;
use anyhow::{bail, Result};
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;

/// Timing parameters of the local input filter, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputThresholds {
    /// Continuous input needed before noise counts as activity
    pub activity_ms: u64,
    /// Silence after which activity turns idle
    pub idle_ms: u64,
    /// Silence after which noise is discarded
    pub noise_ms: u64,
}

impl Default for InputThresholds {
    fn default() -> Self {
        Self {
            activity_ms: ACTIVITY_THRESHOLD_DEFAULT_MS,
            idle_ms: IDLE_THRESHOLD_DEFAULT_MS,
            noise_ms: NOISE_THRESHOLD_DEFAULT_MS,
        }
    }
}

impl InputThresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("activity", self.activity_ms),
            ("idle", self.idle_ms),
            ("noise", self.noise_ms),
        ] {
            if value > INPUT_THRESHOLD_MAX_MS {
                bail!(
                    "{} threshold {} ms exceeds maximum of {} ms",
                    name,
                    value,
                    INPUT_THRESHOLD_MAX_MS
                );
            }
        }
        if self.idle_ms == 0 || self.noise_ms == 0 {
            bail!("Idle and noise thresholds must be greater than 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Idle,
    /// Isolated input, not (yet) considered activity
    Noise,
    Active,
}

#[derive(Debug)]
struct TrackerInner {
    thresholds: InputThresholds,
    state: InputState,
    /// Start of the current burst of input
    first_action_ms: i64,
    last_action_ms: i64,
    display: Option<String>,
}

impl TrackerInner {
    /// Apply timeouts up to `now`
    fn expire(&mut self, now: i64) {
        let silence = now - self.last_action_ms;
        match self.state {
            InputState::Noise if silence >= self.thresholds.noise_ms as i64 => {
                self.state = InputState::Idle;
            }
            InputState::Active if silence >= self.thresholds.idle_ms as i64 => {
                debug!("Local input idle after {} ms of silence", silence);
                self.state = InputState::Idle;
            }
            _ => {}
        }
    }
}

/// Local activity source fed by raw input notifications
///
/// Cloning yields another handle to the same tracker, so an input hook
/// thread can call [`action_notify`](Self::action_notify) while the monitor
/// owns a boxed clone.
#[derive(Debug, Clone)]
pub struct InputActivityTracker {
    inner: Arc<Mutex<TrackerInner>>,
    clock: Arc<dyn TimeSource>,
}

impl InputActivityTracker {
    pub fn new(clock: Arc<dyn TimeSource>, thresholds: InputThresholds) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackerInner {
                thresholds,
                state: InputState::Idle,
                first_action_ms: 0,
                last_action_ms: 0,
                display: None,
            })),
            clock,
        }
    }

    /// Record one mouse or keyboard event
    pub fn action_notify(&self) {
        let now = self.clock.monotonic_millis();
        let mut inner = self.inner.lock();
        inner.expire(now);

        match inner.state {
            InputState::Idle => {
                inner.first_action_ms = now;
                inner.state = if inner.thresholds.activity_ms == 0 {
                    InputState::Active
                } else {
                    InputState::Noise
                };
            }
            InputState::Noise => {
                if now - inner.first_action_ms >= inner.thresholds.activity_ms as i64 {
                    debug!("Local input promoted to activity");
                    inner.state = InputState::Active;
                }
            }
            InputState::Active => {}
        }
        inner.last_action_ms = now;
    }

    pub fn state(&self) -> InputState {
        let now = self.clock.monotonic_millis();
        let mut inner = self.inner.lock();
        inner.expire(now);
        inner.state
    }

    pub fn thresholds(&self) -> InputThresholds {
        self.inner.lock().thresholds
    }

    pub fn set_thresholds(&self, thresholds: InputThresholds) {
        self.inner.lock().thresholds = thresholds;
    }

    pub fn display(&self) -> Option<String> {
        self.inner.lock().display.clone()
    }
}

impl LocalActivitySource for InputActivityTracker {
    fn init(&mut self, display: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.display = Some(display.to_string());
        info!("Input activity tracker attached to '{}'", display);
        Ok(())
    }

    fn terminate(&mut self) {
        let mut inner = self.inner.lock();
        if inner.display.take().is_some() {
            inner.state = InputState::Idle;
            info!("Input activity tracker detached");
        }
    }

    fn is_active(&mut self) -> bool {
        self.state() == InputState::Active
    }

    fn force_idle(&mut self) {
        self.inner.lock().state = InputState::Idle;
    }
}
