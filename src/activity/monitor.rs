use super::{ActivityListener, ActivityState, LocalActivitySource};
use crate::constants::STALENESS_WINDOW_DEFAULT_SECS;
use crate::time_source::TimeSource;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Activity monitor shared across threads
///
/// Cloning yields another handle to the same monitor. All operations take
/// the internal lock for their whole duration, so `shift_time` is atomic
/// with respect to a concurrent `heartbeat`.
#[derive(Clone)]
pub struct ActivityMonitor {
    inner: Arc<Mutex<MonitorInner>>,
    clock: Arc<dyn TimeSource>,
}

struct MonitorInner {
    local: Box<dyn LocalActivitySource>,
    /// Whether `local` attached successfully in `init()`
    local_attached: bool,
    /// Last activity per reporter (monotonic milliseconds)
    external_activity: HashMap<String, i64>,
    monitor_state: ActivityState,
    suspended: bool,
    staleness_window_ms: i64,
    listener: Option<Box<dyn ActivityListener>>,
    /// Bumped by `set_listener` so a listener running unlocked cannot overwrite its replacement
    listener_generation: u64,
}

impl ActivityMonitor {
    pub fn new(local: Box<dyn LocalActivitySource>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MonitorInner {
                local,
                local_attached: false,
                external_activity: HashMap::new(),
                monitor_state: ActivityState::Unknown,
                suspended: false,
                staleness_window_ms: (STALENESS_WINDOW_DEFAULT_SECS * 1000) as i64,
                listener: None,
                listener_generation: 0,
            })),
            clock,
        }
    }

    /// Attach the local backend; failure leaves the monitor relying on peer reports
    pub fn init(&self, display: &str) {
        let mut inner = self.inner.lock();
        match inner.local.init(display) {
            Ok(()) => {
                inner.local_attached = true;
                info!("Activity monitor initialized on '{}'", display);
            }
            Err(e) => {
                inner.local_attached = false;
                inner.monitor_state = ActivityState::Unknown;
                warn!(
                    "Local activity detection unavailable on '{}': {:#}. Using peer reports only",
                    display, e
                );
            }
        }
    }

    pub fn terminate(&self) {
        let mut inner = self.inner.lock();
        if inner.local_attached {
            inner.local.terminate();
            inner.local_attached = false;
            info!("Activity monitor terminated");
        }
    }

    pub fn suspend(&self) {
        let mut inner = self.inner.lock();
        inner.suspended = true;
        inner.monitor_state = ActivityState::Suspended;
        debug!("Activity monitor suspended");
    }

    /// Clear the suspension; the state is resolved again on the next heartbeat
    pub fn resume(&self) {
        let mut inner = self.inner.lock();
        inner.suspended = false;
        inner.monitor_state = ActivityState::Unknown;
        debug!("Activity monitor resumed");
    }

    pub fn force_idle(&self) {
        let mut inner = self.inner.lock();
        if inner.local_attached {
            inner.local.force_idle();
        }
        if !inner.suspended {
            inner.monitor_state = ActivityState::Idle;
        }
        debug!("Activity monitor forced idle");
    }

    /// Shift all peer report timestamps by `delta_secs`
    pub fn shift_time(&self, delta_secs: i64) {
        let mut inner = self.inner.lock();
        let delta_ms = delta_secs.saturating_mul(1000);
        for timestamp in inner.external_activity.values_mut() {
            *timestamp = timestamp.saturating_add(delta_ms);
        }
        debug!("Shifted peer activity by {} s", delta_secs);
    }

    /// Resolve the current activity state and notify the listener on change
    pub fn heartbeat(&self) -> ActivityState {
        let now = self.clock.monotonic_millis();

        let (state, notify) = {
            let mut inner = self.inner.lock();
            let window = inner.staleness_window_ms;
            inner.external_activity.retain(|who, timestamp| {
                let fresh = now.saturating_sub(*timestamp) <= window;
                if !fresh {
                    debug!("Peer '{}' activity expired", who);
                }
                fresh
            });

            let state = if inner.suspended {
                ActivityState::Suspended
            } else {
                let local_active = inner.local_attached && inner.local.is_active();
                if local_active || !inner.external_activity.is_empty() {
                    ActivityState::Active
                } else {
                    ActivityState::Idle
                }
            };

            let changed = state != inner.monitor_state;
            inner.monitor_state = state;
            let notify = if changed {
                debug!("Activity state is now {}", state);
                let generation = inner.listener_generation;
                inner.listener.take().map(|listener| (listener, generation))
            } else {
                None
            };
            (state, notify)
        };

        // Called unlocked so the listener may use this monitor
        if let Some((mut listener, generation)) = notify {
            let keep = listener.action_notify(state);
            let mut inner = self.inner.lock();
            if keep && inner.listener_generation == generation && inner.listener.is_none() {
                inner.listener = Some(listener);
            } else if !keep {
                debug!("Activity listener unsubscribed");
            }
        }

        state
    }

    /// Record activity (or explicit inactivity) of a peer
    pub fn report_external_activity(&self, who: &str, act: bool) {
        let now = self.clock.monotonic_millis();
        let mut inner = self.inner.lock();
        if act {
            inner.external_activity.insert(who.to_string(), now);
        } else if inner.external_activity.remove(who).is_some() {
            debug!("Peer '{}' reported inactivity", who);
        }
    }

    pub fn get_current_state(&self) -> ActivityState {
        self.inner.lock().monitor_state
    }

    pub fn set_listener(&self, listener: Box<dyn ActivityListener>) {
        let mut inner = self.inner.lock();
        inner.listener = Some(listener);
        inner.listener_generation += 1;
    }

    pub fn clear_listener(&self) {
        let mut inner = self.inner.lock();
        inner.listener = None;
        inner.listener_generation += 1;
    }

    pub fn set_staleness_window_secs(&self, secs: u64) {
        self.inner.lock().staleness_window_ms = (secs * 1000) as i64;
        info!("Peer activity staleness window set to {} seconds", secs);
    }

    pub fn get_staleness_window_secs(&self) -> u64 {
        (self.inner.lock().staleness_window_ms / 1000) as u64
    }

    /// Number of peers whose last report is still tracked
    pub fn external_reporter_count(&self) -> usize {
        self.inner.lock().external_activity.len()
    }

    pub fn is_local_attached(&self) -> bool {
        self.inner.lock().local_attached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_source::ManualTimeSource;
    use anyhow::bail;

    struct FailingSource;

    impl LocalActivitySource for FailingSource {
        fn init(&mut self, _display: &str) -> anyhow::Result<()> {
            bail!("no display")
        }

        fn is_active(&mut self) -> bool {
            true
        }
    }

    #[test]
    fn test_failed_init_degrades_to_peer_reports() {
        let clock = Arc::new(ManualTimeSource::new(1_000));
        let monitor = ActivityMonitor::new(Box::new(FailingSource), clock);
        monitor.init(":0");

        assert!(!monitor.is_local_attached());
        assert_eq!(monitor.get_current_state(), ActivityState::Unknown);
        assert_eq!(
            monitor.heartbeat(),
            ActivityState::Idle,
            "Unattached source must not count as activity"
        );

        monitor.report_external_activity("peer1", true);
        assert_eq!(monitor.heartbeat(), ActivityState::Active);
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let clock = Arc::new(ManualTimeSource::new(1_000));
        let monitor = ActivityMonitor::new(Box::new(FailingSource), clock);
        monitor.terminate();
        monitor.terminate();
        assert!(!monitor.is_local_attached());
    }
}
