//! Break timer state machine
//!
//! A [`Timer`] receives one activity sample per tick through
//! [`Timer::process`] and accounts the wall-clock time since the previous
//! tick as either active (elapsed) or idle time. Based on this accounting it
//! reports when the configured limit is reached and resets itself after a
//! long enough idle period or at a daily boundary.

pub mod daily_reset;
pub mod serialization;

use crate::constants::{
    TIMER_AUTO_RESET_DEFAULT_SECS, TIMER_LIMIT_DEFAULT_SECS, TIMER_SNOOZE_DEFAULT_SECS,
};
use crate::time_source::TimeSource;
use crate::utils::format_span;
use daily_reset::DailyReset;
use log::{debug, info, warn};
use serialization::TimerSnapshot;
use std::sync::Arc;

pub use serialization::StateParseError;

/// Lifecycle state of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Never started, or disabled
    Invalid,
    Running,
    Stopped,
}

impl TimerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Invalid => "invalid",
            TimerState::Running => "running",
            TimerState::Stopped => "stopped",
        }
    }
}

impl std::str::FromStr for TimerState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invalid" => Ok(TimerState::Invalid),
            "running" => Ok(TimerState::Running),
            "stopped" => Ok(TimerState::Stopped),
            _ => Err(()),
        }
    }
}

/// Event generated by [`Timer::process`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// No event occurred
    None,
    /// The timer was reset explicitly by the caller
    Reset,
    /// The timer reset itself after sufficient idle time or at the daily boundary
    NaturalReset,
    /// The timer reached its limit (or the end of a snooze period)
    LimitReached,
}

impl std::fmt::Display for TimerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TimerEvent::None => "none",
            TimerEvent::Reset => "reset",
            TimerEvent::NaturalReset => "natural_reset",
            TimerEvent::LimitReached => "limit_reached",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DueReset {
    Natural,
    Daily,
}

#[derive(Debug)]
pub struct Timer {
    /// Id of the timer
    timer_id: String,
    clock: Arc<dyn TimeSource>,

    timer_enabled: bool,
    /// A frozen timer only counts idle time
    timer_frozen: bool,
    timer_state: TimerState,

    snooze_interval: i64,
    /// Don't snooze until the next reset
    snooze_inhibited: bool,

    limit_enabled: bool,
    limit_interval: i64,

    auto_reset_enabled: bool,
    auto_reset_interval: i64,
    daily_reset: DailyReset,

    elapsed_timespan: i64,
    /// Elapsed time when the limit (or a snooze period) last fired, 0 if not since the last reset
    elapsed_timespan_at_last_limit: i64,
    elapsed_idle_timespan: i64,
    total_overdue_timespan: i64,

    last_start_time: i64,
    last_stop_time: i64,
    last_reset_time: i64,
    last_daily_reset_time: i64,

    /// Time of the previous accounted tick
    last_process_time: Option<i64>,
    /// Event to report on the next `process()` call
    pending_event: Option<TimerEvent>,
}

impl Timer {
    /// Create a disabled timer with default policy
    pub fn new(id: impl Into<String>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            timer_id: id.into(),
            clock,
            timer_enabled: false,
            timer_frozen: false,
            timer_state: TimerState::Invalid,
            snooze_interval: TIMER_SNOOZE_DEFAULT_SECS,
            snooze_inhibited: false,
            limit_enabled: true,
            limit_interval: TIMER_LIMIT_DEFAULT_SECS,
            auto_reset_enabled: true,
            auto_reset_interval: TIMER_AUTO_RESET_DEFAULT_SECS,
            daily_reset: DailyReset::Never,
            elapsed_timespan: 0,
            elapsed_timespan_at_last_limit: 0,
            elapsed_idle_timespan: 0,
            total_overdue_timespan: 0,
            last_start_time: 0,
            last_stop_time: 0,
            last_reset_time: 0,
            last_daily_reset_time: 0,
            last_process_time: None,
            pending_event: None,
        }
    }

    fn now(&self) -> i64 {
        self.clock.real_time_secs()
    }

    // ------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------

    pub fn enable(&mut self) {
        if self.timer_enabled {
            return;
        }

        let now = self.now();
        self.timer_enabled = true;
        self.snooze_inhibited = false;
        self.last_process_time = Some(now);

        if self.timer_state == TimerState::Invalid {
            self.stop_timer_at(now);
        }
        // Counting starts at the first enable; nothing to reset before that
        if self.last_reset_time == 0 {
            self.last_reset_time = now;
        }
        info!("Timer '{}' enabled", self.timer_id);
    }

    /// Disable the timer; counters are kept, `process()` becomes a no-op
    pub fn disable(&mut self) {
        if !self.timer_enabled {
            return;
        }

        let now = self.now();
        self.stop_timer_at(now);
        self.timer_enabled = false;
        self.timer_state = TimerState::Invalid;
        self.last_process_time = None;
        info!("Timer '{}' disabled", self.timer_id);
    }

    /// Postpone the next limit event by the snooze interval
    pub fn snooze_timer(&mut self) {
        if !self.timer_enabled {
            return;
        }
        if self.snooze_inhibited {
            debug!("Timer '{}': snooze inhibited until next reset", self.timer_id);
            return;
        }
        self.accrue_overdue();
        self.elapsed_timespan_at_last_limit = self.elapsed_timespan;
        debug!(
            "Timer '{}' snoozed at {}",
            self.timer_id,
            format_span(self.elapsed_timespan)
        );
    }

    /// Forbid snoozing (and repeated limit events) until the next reset
    pub fn inhibit_snooze(&mut self) {
        self.snooze_inhibited = true;
    }

    pub fn start_timer(&mut self) {
        let now = self.now();
        self.start_timer_at(now);
    }

    pub fn stop_timer(&mut self) {
        let now = self.now();
        self.stop_timer_at(now);
    }

    /// Reset elapsed and idle time; the next `process()` reports [`TimerEvent::Reset`]
    pub fn reset_timer(&mut self) {
        let now = self.now();
        self.clear_counters(now);
        self.pending_event = Some(TimerEvent::Reset);
        info!("Timer '{}' reset", self.timer_id);
    }

    /// Reset elapsed and idle time because a new day started
    pub fn daily_reset(&mut self) {
        let now = self.now();
        self.clear_counters(now);
        self.last_daily_reset_time = now;
        info!("Timer '{}' daily reset", self.timer_id);
    }

    pub fn freeze_timer(&mut self, freeze: bool) {
        if self.timer_frozen != freeze {
            debug!(
                "Timer '{}' {}",
                self.timer_id,
                if freeze { "frozen" } else { "unfrozen" }
            );
        }
        self.timer_frozen = freeze;
    }

    fn start_timer_at(&mut self, now: i64) {
        if self.timer_state == TimerState::Running {
            return;
        }
        if self.reset_since_last_stop() {
            self.snooze_inhibited = false;
        }
        self.timer_state = TimerState::Running;
        self.last_start_time = now.max(self.last_stop_time);
        debug!("Timer '{}' started", self.timer_id);
    }

    fn stop_timer_at(&mut self, now: i64) {
        if self.timer_state == TimerState::Stopped {
            return;
        }
        self.timer_state = TimerState::Stopped;
        self.last_stop_time = now;
        debug!("Timer '{}' stopped", self.timer_id);
    }

    fn clear_counters(&mut self, now: i64) {
        self.accrue_overdue();
        self.elapsed_timespan = 0;
        self.elapsed_idle_timespan = 0;
        self.elapsed_timespan_at_last_limit = 0;
        self.snooze_inhibited = false;
        self.last_reset_time = now;
    }

    fn reset_since_last_stop(&self) -> bool {
        self.last_reset_time >= self.last_stop_time
    }

    // ------------------------------------------------------------------
    // Processing
    // ------------------------------------------------------------------

    /// Account one tick and report at most one event
    pub fn process(&mut self, user_is_active: bool) -> TimerEvent {
        if !self.timer_enabled {
            return TimerEvent::None;
        }

        let now = self.now();
        let delta = self
            .last_process_time
            .map(|previous| (now - previous).max(0))
            .unwrap_or(0);
        self.last_process_time = Some(now);

        let mut due = None;
        if user_is_active && !self.timer_frozen {
            self.start_timer_at(now);
            self.elapsed_timespan += delta;
        } else {
            self.stop_timer_at(now);
            self.elapsed_idle_timespan += delta;
            due = self.due_reset(now);
        }

        // Limit wins; a due reset stays due and fires on the next idle tick
        if self.check_limit() {
            return TimerEvent::LimitReached;
        }

        if let Some(event) = self.pending_event.take() {
            return event;
        }

        match due {
            Some(DueReset::Daily) => {
                self.clear_counters(now);
                self.last_daily_reset_time = now;
                info!("Timer '{}' reset at daily boundary", self.timer_id);
                TimerEvent::NaturalReset
            }
            Some(DueReset::Natural) => {
                self.clear_counters(now);
                info!("Timer '{}' reset after idle period", self.timer_id);
                TimerEvent::NaturalReset
            }
            None => TimerEvent::None,
        }
    }

    fn due_reset(&self, now: i64) -> Option<DueReset> {
        if self
            .get_next_daily_reset_time()
            .is_some_and(|next| now >= next)
        {
            return Some(DueReset::Daily);
        }
        if self.auto_reset_due(now) {
            return Some(DueReset::Natural);
        }
        None
    }

    fn auto_reset_due(&self, now: i64) -> bool {
        self.idle_reset_time().is_some_and(|next| now >= next)
    }

    /// End of the current idle stretch's auto-reset interval, ignoring the enabled flag
    fn idle_reset_time(&self) -> Option<i64> {
        if !self.auto_reset_enabled
            || self.auto_reset_interval <= 0
            || self.timer_state != TimerState::Stopped
            || self.reset_since_last_stop()
        {
            return None;
        }
        Some(self.last_stop_time + self.auto_reset_interval)
    }

    /// Elapsed time at which the next limit event fires
    fn next_limit_elapsed(&self) -> Option<i64> {
        if !self.timer_enabled || !self.limit_enabled || self.limit_interval <= 0 {
            return None;
        }
        if self.elapsed_timespan_at_last_limit == 0 {
            return Some(self.limit_interval);
        }
        if self.snooze_inhibited || self.snooze_interval <= 0 {
            return None;
        }
        Some(
            (self.elapsed_timespan_at_last_limit + self.snooze_interval).max(self.limit_interval),
        )
    }

    fn check_limit(&mut self) -> bool {
        let Some(threshold) = self.next_limit_elapsed() else {
            return false;
        };
        if self.elapsed_timespan < threshold
            || self.elapsed_timespan == self.elapsed_timespan_at_last_limit
        {
            return false;
        }

        self.accrue_overdue();
        self.elapsed_timespan_at_last_limit = self.elapsed_timespan;

        info!(
            "Timer '{}' reached its limit at {} (overdue total {})",
            self.timer_id,
            format_span(self.elapsed_timespan),
            format_span(self.total_overdue_timespan)
        );
        true
    }

    /// Add the time spent past the limit that no limit event accounted yet
    fn accrue_overdue(&mut self) {
        if !self.limit_enabled || self.limit_interval <= 0 {
            return;
        }
        let accounted = self.elapsed_timespan_at_last_limit.max(self.limit_interval);
        self.total_overdue_timespan += (self.elapsed_timespan - accounted).max(0);
    }

    // ------------------------------------------------------------------
    // State inquiry
    // ------------------------------------------------------------------

    pub fn get_id(&self) -> &str {
        &self.timer_id
    }

    pub fn get_state(&self) -> TimerState {
        self.timer_state
    }

    pub fn get_elapsed_time(&self) -> i64 {
        self.elapsed_timespan
    }

    pub fn get_elapsed_idle_time(&self) -> i64 {
        self.elapsed_idle_timespan
    }

    pub fn get_total_overdue_time(&self) -> i64 {
        self.total_overdue_timespan
    }

    pub fn get_last_start_time(&self) -> i64 {
        self.last_start_time
    }

    pub fn get_last_stop_time(&self) -> i64 {
        self.last_stop_time
    }

    pub fn get_last_reset_time(&self) -> i64 {
        self.last_reset_time
    }

    pub fn is_running(&self) -> bool {
        self.timer_state == TimerState::Running
    }

    pub fn is_enabled(&self) -> bool {
        self.timer_enabled
    }

    pub fn is_frozen(&self) -> bool {
        self.timer_frozen
    }

    pub fn is_snooze_inhibited(&self) -> bool {
        self.snooze_inhibited
    }

    // ------------------------------------------------------------------
    // Policy
    // ------------------------------------------------------------------

    pub fn set_auto_reset(&mut self, secs: i64) {
        self.auto_reset_interval = secs;
    }

    pub fn set_auto_reset_enabled(&mut self, enabled: bool) {
        self.auto_reset_enabled = enabled;
    }

    pub fn set_daily_reset(&mut self, daily_reset: DailyReset) {
        self.daily_reset = daily_reset;
    }

    pub fn is_auto_reset_enabled(&self) -> bool {
        self.auto_reset_enabled
    }

    pub fn get_auto_reset(&self) -> i64 {
        self.auto_reset_interval
    }

    pub fn has_daily_reset(&self) -> bool {
        self.daily_reset.is_enabled()
    }

    /// Time at which the current idle stretch resets the timer, if it stays idle
    pub fn get_next_reset_time(&self) -> Option<i64> {
        if !self.timer_enabled {
            return None;
        }
        self.idle_reset_time()
    }

    pub fn get_next_daily_reset_time(&self) -> Option<i64> {
        if !self.timer_enabled {
            return None;
        }
        let base = self.last_reset_time.max(self.last_daily_reset_time);
        if base == 0 {
            return None;
        }
        self.daily_reset.next_after(base)
    }

    pub fn set_limit(&mut self, secs: i64) {
        self.limit_interval = secs;
        self.snooze_inhibited = false;
    }

    pub fn set_limit_enabled(&mut self, enabled: bool) {
        self.limit_enabled = enabled;
        self.snooze_inhibited = false;
    }

    pub fn is_limit_enabled(&self) -> bool {
        self.limit_enabled
    }

    pub fn get_limit(&self) -> i64 {
        self.limit_interval
    }

    /// Time at which the next limit event fires if the user stays active
    pub fn get_next_limit_time(&self) -> Option<i64> {
        if self.timer_state != TimerState::Running {
            return None;
        }
        let threshold = self.next_limit_elapsed()?;
        let base = self.last_process_time.unwrap_or_else(|| self.now());
        Some(base + (threshold - self.elapsed_timespan).max(0))
    }

    pub fn set_snooze(&mut self, secs: i64) {
        self.snooze_interval = secs;
    }

    pub fn get_snooze(&self) -> i64 {
        self.snooze_interval
    }

    // ------------------------------------------------------------------
    // State serialization
    // ------------------------------------------------------------------

    /// Encode the persistent state in the current record format
    pub fn serialize_state(&self) -> String {
        TimerSnapshot {
            save_time: self.now(),
            state: self.timer_state,
            elapsed: self.elapsed_timespan,
            idle: self.elapsed_idle_timespan,
            last_start: self.last_start_time,
            last_stop: self.last_stop_time,
            last_reset: self.last_reset_time,
            overdue: self.total_overdue_timespan,
        }
        .encode()
    }

    /// Restore state written by `serialize_state()` with format `version`
    ///
    /// Returns false and leaves the timer untouched if the record is malformed.
    pub fn deserialize_state(&mut self, state: &str, version: u32) -> bool {
        match TimerSnapshot::decode(state, version) {
            Ok(snapshot) => {
                self.restore(snapshot);
                true
            }
            Err(e) => {
                warn!("Ignoring saved state of timer '{}': {}", self.timer_id, e);
                false
            }
        }
    }

    fn restore(&mut self, snapshot: TimerSnapshot) {
        let now = self.now();
        let downtime = (now - snapshot.save_time).max(0);

        self.elapsed_timespan = snapshot.elapsed;
        self.elapsed_idle_timespan = snapshot.idle + downtime;
        self.total_overdue_timespan = snapshot.overdue;
        self.last_start_time = snapshot.last_start;
        self.last_stop_time = snapshot.last_stop;
        self.last_reset_time = snapshot.last_reset;
        // Records of timers that never reset carry no day base; count from the save
        self.last_daily_reset_time = if snapshot.last_reset == 0 {
            snapshot.save_time
        } else {
            0
        };
        self.timer_state = snapshot.state;
        self.pending_event = None;
        self.last_process_time = Some(now);

        // The process was not running: the user was away since the save
        if snapshot.state == TimerState::Running && downtime > 0 {
            self.timer_state = TimerState::Stopped;
            self.last_stop_time = snapshot.save_time.max(snapshot.last_start);
        }

        // Already notified before the restart; next reminder after a snooze period
        self.elapsed_timespan_at_last_limit = if self.limit_enabled
            && self.limit_interval > 0
            && self.elapsed_timespan >= self.limit_interval
        {
            self.elapsed_timespan
        } else {
            0
        };

        if self.auto_reset_due(now) {
            info!(
                "Timer '{}' idle for {} since last run, resetting",
                self.timer_id,
                format_span(now - self.last_stop_time)
            );
            self.clear_counters(now);
            self.pending_event = Some(TimerEvent::NaturalReset);
        }

        debug!(
            "Timer '{}' restored: {} elapsed, {} idle, {}",
            self.timer_id,
            format_span(self.elapsed_timespan),
            format_span(self.elapsed_idle_timespan),
            self.timer_state.as_str()
        );
    }
}
