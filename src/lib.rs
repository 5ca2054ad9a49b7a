// Library interface for BreakTime
// The daemon binary and the integration tests drive the core through this crate

pub mod activity;
pub mod config;
pub mod config_file;
pub mod constants;
pub mod hook_protocol;
pub mod state_file;
pub mod time_source;
pub mod timer;
pub mod utils;

use activity::{ActivityMonitor, ActivityState, InputActivityTracker, LocalActivitySource};
use anyhow::{anyhow, Context, Result};
use config_file::Config;
use hook_protocol::HookCommand;
use log::{debug, info};
use state_file::TimerStateStore;
use std::sync::Arc;
use time_source::TimeSource;
use timer::{Timer, TimerEvent};

/// Event emitted by one timer during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerTick {
    pub timer_id: String,
    pub event: TimerEvent,
}

/// Activity monitor plus the configured break timers, driven by `tick()`
pub struct BreakTimeCore {
    monitor: ActivityMonitor,
    /// Local input tracker, absent when a custom local source is used
    tracker: Option<InputActivityTracker>,
    timers: Vec<Timer>,
}

impl BreakTimeCore {
    /// Create a core that detects local activity through an [`InputActivityTracker`]
    pub fn new(config: &Config, clock: Arc<dyn TimeSource>) -> Result<Self> {
        let tracker = InputActivityTracker::new(clock.clone(), config.monitor.input_thresholds());
        let mut core = Self::with_local_source(config, clock, Box::new(tracker.clone()))?;
        core.tracker = Some(tracker);
        Ok(core)
    }

    /// Create a core with a platform specific local activity source
    pub fn with_local_source(
        config: &Config,
        clock: Arc<dyn TimeSource>,
        local: Box<dyn LocalActivitySource>,
    ) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let monitor = ActivityMonitor::new(local, clock.clone());
        monitor.set_staleness_window_secs(config.monitor.staleness_window_secs);

        let timers = config
            .timers
            .iter()
            .map(|timer| timer.build_timer(clock.clone()))
            .collect::<Result<Vec<_>>>()?;
        info!("Configured {} timer(s)", timers.len());

        Ok(Self {
            monitor,
            tracker: None,
            timers,
        })
    }

    /// Attach the local activity source; never fails, see [`ActivityMonitor::init`]
    pub fn init(&self, display: &str) {
        self.monitor.init(display);
    }

    pub fn shutdown(&self) {
        self.monitor.terminate();
    }

    /// Run one heartbeat and feed the resolved state to every timer
    pub fn tick(&mut self) -> Vec<TimerTick> {
        let state = self.monitor.heartbeat();
        let active = state == ActivityState::Active;

        let mut ticks = Vec::new();
        for timer in &mut self.timers {
            let event = timer.process(active);
            if event != TimerEvent::None {
                info!("Timer '{}': {}", timer.get_id(), event);
                ticks.push(TimerTick {
                    timer_id: timer.get_id().to_string(),
                    event,
                });
            }
        }
        ticks
    }

    /// Apply one command received from the input hook
    pub fn apply(&mut self, command: HookCommand) -> Result<()> {
        debug!("Hook command: {:?}", command);
        match command {
            HookCommand::Input => {
                let tracker = self
                    .tracker
                    .as_ref()
                    .ok_or_else(|| anyhow!("No input tracker for raw input events"))?;
                tracker.action_notify();
            }
            HookCommand::Peer { who, active } => {
                self.monitor.report_external_activity(&who, active)
            }
            HookCommand::Suspend => self.monitor.suspend(),
            HookCommand::Resume => self.monitor.resume(),
            HookCommand::Idle => self.monitor.force_idle(),
            HookCommand::Shift(secs) => self.monitor.shift_time(secs),
            HookCommand::Reset(id) => self.reset_timer(&id)?,
            HookCommand::Snooze(id) => self.snooze_timer(&id)?,
        }
        Ok(())
    }

    pub fn monitor(&self) -> &ActivityMonitor {
        &self.monitor
    }

    pub fn tracker(&self) -> Option<&InputActivityTracker> {
        self.tracker.as_ref()
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn timer(&self, id: &str) -> Option<&Timer> {
        self.timers.iter().find(|t| t.get_id() == id)
    }

    pub fn timer_mut(&mut self, id: &str) -> Option<&mut Timer> {
        self.timers.iter_mut().find(|t| t.get_id() == id)
    }

    fn known_timer_mut(&mut self, id: &str) -> Result<&mut Timer> {
        self.timer_mut(id)
            .ok_or_else(|| anyhow!("Unknown timer '{}'", id))
    }

    pub fn reset_timer(&mut self, id: &str) -> Result<()> {
        self.known_timer_mut(id)?.reset_timer();
        Ok(())
    }

    pub fn snooze_timer(&mut self, id: &str) -> Result<()> {
        self.known_timer_mut(id)?.snooze_timer();
        Ok(())
    }

    /// Freeze or unfreeze every timer, e.g. while a break is shown
    pub fn freeze_timers(&mut self, freeze: bool) {
        for timer in &mut self.timers {
            timer.freeze_timer(freeze);
        }
    }

    /// Restore saved timer state; returns the number of timers restored
    pub fn restore_state(&mut self, store: &TimerStateStore) -> usize {
        let restored = self
            .timers
            .iter_mut()
            .filter(|timer| timer.is_enabled())
            .map(|timer| store.restore_into(timer))
            .filter(|accepted| *accepted)
            .count();
        info!(
            "Restored state of {} of {} timer(s)",
            restored,
            self.timers.len()
        );
        restored
    }

    pub fn save_state(&self) -> TimerStateStore {
        TimerStateStore::from_timers(&self.timers)
    }
}
