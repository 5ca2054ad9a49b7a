// Integration tests for the break timer state machine

use breaktime::time_source::ManualTimeSource;
use breaktime::timer::daily_reset::{DailyReset, DayTimePred};
use breaktime::timer::{Timer, TimerEvent, TimerState};
use breaktime::utils::time_of_day::TimeOfDay;
use std::sync::Arc;

// 2023-11-14 22:13:20 UTC
const START: i64 = 1_700_000_000;
// 2023-11-15 00:00:00 UTC
const NEXT_MIDNIGHT: i64 = 1_700_006_400;

fn new_timer(limit: i64, auto_reset: i64, snooze: i64) -> (Timer, Arc<ManualTimeSource>) {
    let clock = Arc::new(ManualTimeSource::new(START));
    let mut timer = Timer::new("rest_break", clock.clone());
    timer.set_limit(limit);
    timer.set_auto_reset(auto_reset);
    timer.set_snooze(snooze);
    timer.enable();
    (timer, clock)
}

/// Advance one second per tick and collect the non-empty events
fn run(timer: &mut Timer, clock: &ManualTimeSource, ticks: usize, active: bool) -> Vec<TimerEvent> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        clock.advance_secs(1);
        let event = timer.process(active);
        if event != TimerEvent::None {
            events.push(event);
        }
    }
    events
}

#[test]
fn test_elapsed_is_sum_of_tick_deltas() {
    let (mut timer, clock) = new_timer(100_000, 60, 60);

    let mut expected = 0;
    for delta in [1, 2, 1, 5, 3, 1] {
        clock.advance_secs(delta);
        timer.process(true);
        expected += delta;
        assert_eq!(timer.get_elapsed_time(), expected);
    }
    assert_eq!(timer.get_state(), TimerState::Running);
    assert_eq!(timer.get_elapsed_idle_time(), 0);
}

#[test]
fn test_limit_fires_exactly_once_at_limit() {
    let (mut timer, clock) = new_timer(1800, 300, 60);

    let events = run(&mut timer, &clock, 1799, true);
    assert!(events.is_empty(), "No event before the limit: {:?}", events);

    clock.advance_secs(1);
    assert_eq!(
        timer.process(true),
        TimerEvent::LimitReached,
        "Limit fires at the tick elapsed first reaches 1800"
    );
    assert_eq!(timer.get_elapsed_time(), 1800);

    clock.advance_secs(1);
    assert_eq!(
        timer.process(true),
        TimerEvent::None,
        "One more active second must not re-emit"
    );
}

#[test]
fn test_limit_repeats_after_snooze_interval() {
    let (mut timer, clock) = new_timer(10, 300, 5);

    let events = run(&mut timer, &clock, 15, true);
    assert_eq!(
        events,
        vec![TimerEvent::LimitReached, TimerEvent::LimitReached],
        "Limit at 10s, reminder again at 15s"
    );
    assert_eq!(timer.get_total_overdue_time(), 5);
}

#[test]
fn test_snooze_postpones_next_limit() {
    let (mut timer, clock) = new_timer(10, 300, 20);

    assert_eq!(run(&mut timer, &clock, 10, true), vec![TimerEvent::LimitReached]);
    run(&mut timer, &clock, 5, true);

    timer.snooze_timer();
    assert_eq!(
        timer.get_next_limit_time(),
        Some(START + 15 + 20),
        "Snooze counts from the current elapsed time"
    );
    assert!(run(&mut timer, &clock, 19, true).is_empty());
    assert_eq!(run(&mut timer, &clock, 1, true), vec![TimerEvent::LimitReached]);
}

#[test]
fn test_inhibited_snooze_suppresses_reminders_until_reset() {
    let (mut timer, clock) = new_timer(10, 300, 5);

    assert_eq!(run(&mut timer, &clock, 10, true), vec![TimerEvent::LimitReached]);
    timer.inhibit_snooze();
    timer.snooze_timer();
    assert!(
        run(&mut timer, &clock, 50, true).is_empty(),
        "No reminders while snooze is inhibited"
    );
    assert_eq!(timer.get_next_limit_time(), None);

    timer.reset_timer();
    assert_eq!(run(&mut timer, &clock, 1, true), vec![TimerEvent::Reset]);
    assert!(!timer.is_snooze_inhibited());
    assert_eq!(run(&mut timer, &clock, 9, true), vec![TimerEvent::LimitReached]);
}

#[test]
fn test_natural_reset_fires_once_per_idle_stretch() {
    let (mut timer, clock) = new_timer(1000, 30, 60);

    run(&mut timer, &clock, 10, true);
    assert_eq!(timer.get_elapsed_time(), 10);

    let events = run(&mut timer, &clock, 120, false);
    assert_eq!(
        events,
        vec![TimerEvent::NaturalReset],
        "Exactly one natural reset per idle stretch"
    );
    assert_eq!(timer.get_elapsed_time(), 0);
    assert_eq!(timer.get_last_reset_time(), START + 11 + 30);

    // A second stretch after renewed activity resets again
    run(&mut timer, &clock, 5, true);
    let events = run(&mut timer, &clock, 40, false);
    assert_eq!(events, vec![TimerEvent::NaturalReset]);
}

#[test]
fn test_activity_postpones_natural_reset() {
    let (mut timer, clock) = new_timer(1000, 30, 60);

    for _ in 0..5 {
        run(&mut timer, &clock, 5, true);
        assert!(run(&mut timer, &clock, 29, false).is_empty());
    }
    assert_eq!(timer.get_elapsed_time(), 25);
}

#[test]
fn test_auto_reset_disabled() {
    let (mut timer, clock) = new_timer(1000, 30, 60);
    timer.set_auto_reset_enabled(false);

    run(&mut timer, &clock, 10, true);
    assert!(run(&mut timer, &clock, 100, false).is_empty());
    assert_eq!(timer.get_elapsed_time(), 10);
    assert_eq!(timer.get_next_reset_time(), None);
}

#[test]
fn test_next_reset_time_follows_idle_stretch() {
    let (mut timer, clock) = new_timer(1000, 30, 60);

    run(&mut timer, &clock, 10, true);
    assert_eq!(timer.get_next_reset_time(), None, "No reset pending while running");

    run(&mut timer, &clock, 1, false);
    assert_eq!(timer.get_next_reset_time(), Some(START + 11 + 30));

    timer.set_auto_reset(60);
    assert_eq!(
        timer.get_next_reset_time(),
        Some(START + 11 + 60),
        "Changing the interval is reflected immediately"
    );
}

#[test]
fn test_limit_wins_tie_with_natural_reset() {
    let (mut timer, clock) = new_timer(1000, 30, 60);

    run(&mut timer, &clock, 100, true);
    run(&mut timer, &clock, 30, false);

    // Both the limit and the natural reset become due on the same tick
    timer.set_limit(50);
    assert_eq!(run(&mut timer, &clock, 1, false), vec![TimerEvent::LimitReached]);
    assert_eq!(
        run(&mut timer, &clock, 1, false),
        vec![TimerEvent::NaturalReset],
        "The deferred reset fires on the next tick"
    );
    assert_eq!(timer.get_elapsed_time(), 0);
}

#[test]
fn test_explicit_reset_keeps_overdue_time() {
    let (mut timer, clock) = new_timer(10, 300, 5);

    run(&mut timer, &clock, 15, true);
    let overdue = timer.get_total_overdue_time();
    assert_eq!(overdue, 5);

    timer.reset_timer();
    assert_eq!(timer.get_elapsed_time(), 0);
    assert_eq!(timer.get_elapsed_idle_time(), 0);
    assert_eq!(timer.get_total_overdue_time(), overdue);
    assert_eq!(
        timer.process(true),
        TimerEvent::Reset,
        "Explicit reset is reported by the next process()"
    );
}

#[test]
fn test_snooze_accounts_overrun_since_last_limit() {
    let (mut timer, clock) = new_timer(10, 300, 100);

    assert_eq!(run(&mut timer, &clock, 30, true), vec![TimerEvent::LimitReached]);
    timer.snooze_timer();
    assert_eq!(timer.get_total_overdue_time(), 20);

    assert_eq!(run(&mut timer, &clock, 100, true), vec![TimerEvent::LimitReached]);
    assert_eq!(timer.get_elapsed_time(), 130);
    assert_eq!(timer.get_total_overdue_time(), 120, "Everything past the limit counts");
}

#[test]
fn test_reset_accounts_overrun_since_last_limit() {
    let (mut timer, clock) = new_timer(10, 300, 100);

    run(&mut timer, &clock, 30, true);
    timer.reset_timer();
    assert_eq!(timer.get_total_overdue_time(), 20);

    // Natural resets account the overrun as well
    run(&mut timer, &clock, 25, true);
    assert_eq!(run(&mut timer, &clock, 301, false), vec![TimerEvent::NaturalReset]);
    assert_eq!(timer.get_total_overdue_time(), 35);
}

#[test]
fn test_never_started_timer_does_not_reset() {
    let (mut timer, clock) = new_timer(1000, 30, 60);

    assert!(
        run(&mut timer, &clock, 100, false).is_empty(),
        "Nothing to reset before the first active second"
    );
    assert_eq!(timer.get_last_reset_time(), START);

    run(&mut timer, &clock, 5, true);
    assert_eq!(run(&mut timer, &clock, 31, false), vec![TimerEvent::NaturalReset]);
}

#[test]
fn test_frozen_timer_only_counts_idle() {
    let (mut timer, clock) = new_timer(1000, 300, 60);

    run(&mut timer, &clock, 10, true);
    timer.freeze_timer(true);
    run(&mut timer, &clock, 20, true);
    assert_eq!(timer.get_elapsed_time(), 10, "Active time is held while frozen");
    assert_eq!(timer.get_elapsed_idle_time(), 20);
    assert!(!timer.is_running());

    timer.freeze_timer(false);
    run(&mut timer, &clock, 5, true);
    assert_eq!(timer.get_elapsed_time(), 15);
}

#[test]
fn test_next_limit_time_while_running() {
    let (mut timer, clock) = new_timer(100, 300, 60);

    assert_eq!(timer.get_next_limit_time(), None, "Only known while running");
    run(&mut timer, &clock, 40, true);
    assert_eq!(timer.get_next_limit_time(), Some(START + 100));

    timer.set_limit(200);
    assert_eq!(timer.get_next_limit_time(), Some(START + 200));

    timer.set_limit_enabled(false);
    assert_eq!(timer.get_next_limit_time(), None);
}

#[test]
fn test_daily_reset_at_boundary_while_idle() {
    let (mut timer, clock) = new_timer(100_000, 0, 60);
    timer.set_auto_reset_enabled(false);
    timer.set_daily_reset(DailyReset::at(DayTimePred::utc(TimeOfDay::midnight())));

    assert_eq!(timer.get_next_daily_reset_time(), Some(NEXT_MIDNIGHT));

    run(&mut timer, &clock, 60, true);
    clock.set_secs(NEXT_MIDNIGHT - 1);
    timer.process(true);
    assert!(timer.get_elapsed_time() > 60);

    // Active across the boundary postpones the reset
    clock.set_secs(NEXT_MIDNIGHT);
    assert_eq!(timer.process(true), TimerEvent::None);

    clock.advance_secs(1);
    assert_eq!(timer.process(false), TimerEvent::NaturalReset);
    assert_eq!(timer.get_elapsed_time(), 0);
    assert_eq!(timer.get_next_daily_reset_time(), Some(NEXT_MIDNIGHT + 86_400));

    assert!(run(&mut timer, &clock, 100, false).is_empty(), "Once per day");
}

#[test]
fn test_daily_reset_survives_restart_of_never_reset_timer() {
    let clock = Arc::new(ManualTimeSource::new(START));
    let mut timer = Timer::new("daily_limit", clock.clone());
    timer.set_limit(100_000);
    timer.set_auto_reset_enabled(false);
    timer.set_daily_reset(DailyReset::at(DayTimePred::utc(TimeOfDay::midnight())));
    timer.enable();

    // Saved before its first reset: last_reset is zero
    let state = format!("{} stopped 60 0 {} {} 0 0", START, START - 60, START);
    assert!(timer.deserialize_state(&state, 3));
    assert_eq!(timer.get_next_daily_reset_time(), Some(NEXT_MIDNIGHT));

    clock.set_secs(NEXT_MIDNIGHT + 3600);
    assert_eq!(timer.process(false), TimerEvent::NaturalReset);
    assert_eq!(timer.get_elapsed_time(), 0);
}

#[test]
fn test_daily_reset_survives_serialize_roundtrip() {
    let (mut timer, clock) = new_timer(100_000, 0, 60);
    timer.set_auto_reset_enabled(false);
    timer.set_daily_reset(DailyReset::at(DayTimePred::utc(TimeOfDay::midnight())));
    run(&mut timer, &clock, 60, true);
    let state = timer.serialize_state();

    let mut restored = Timer::new("rest_break", clock.clone());
    restored.set_limit(100_000);
    restored.set_auto_reset_enabled(false);
    restored.set_daily_reset(DailyReset::at(DayTimePred::utc(TimeOfDay::midnight())));
    restored.enable();
    assert!(restored.deserialize_state(&state, 3));
    assert_eq!(restored.get_next_daily_reset_time(), Some(NEXT_MIDNIGHT));

    clock.set_secs(NEXT_MIDNIGHT + 3600);
    assert_eq!(run(&mut restored, &clock, 10, false), vec![TimerEvent::NaturalReset]);
}

#[test]
fn test_disabled_timer_is_inert() {
    let (mut timer, clock) = new_timer(10, 30, 5);
    run(&mut timer, &clock, 5, true);
    timer.disable();

    assert!(run(&mut timer, &clock, 100, true).is_empty());
    assert_eq!(timer.get_elapsed_time(), 5, "Counters survive disable");
    assert_eq!(timer.get_state(), TimerState::Invalid);
    assert_eq!(timer.get_next_limit_time(), None);
    assert_eq!(timer.get_next_reset_time(), None);
}

#[test]
fn test_serialize_roundtrip_into_fresh_timer() {
    let (mut timer, clock) = new_timer(10, 300, 5);
    run(&mut timer, &clock, 20, true);
    run(&mut timer, &clock, 7, false);
    run(&mut timer, &clock, 3, true);

    let state = timer.serialize_state();

    let mut restored = Timer::new("rest_break", clock.clone());
    restored.set_limit(10);
    restored.set_snooze(5);
    restored.set_auto_reset(300);
    restored.enable();
    assert!(restored.deserialize_state(&state, 3));

    assert_eq!(restored.get_elapsed_time(), timer.get_elapsed_time());
    assert_eq!(restored.get_elapsed_idle_time(), timer.get_elapsed_idle_time());
    assert_eq!(restored.get_total_overdue_time(), timer.get_total_overdue_time());
    assert_eq!(restored.get_state(), timer.get_state());
    assert_eq!(restored.get_last_start_time(), timer.get_last_start_time());
    assert_eq!(restored.get_last_reset_time(), timer.get_last_reset_time());
}

#[test]
fn test_restore_after_downtime_counts_idle() {
    let (mut timer, clock) = new_timer(1000, 600, 60);
    run(&mut timer, &clock, 100, true);
    let save_time = START + 100;
    let state = timer.serialize_state();

    clock.advance_secs(120);
    let mut restored = Timer::new("rest_break", clock.clone());
    restored.set_limit(1000);
    restored.set_auto_reset(600);
    restored.enable();
    assert!(restored.deserialize_state(&state, 3));

    assert_eq!(restored.get_state(), TimerState::Stopped);
    assert_eq!(restored.get_last_stop_time(), save_time);
    assert_eq!(restored.get_elapsed_time(), 100);
    assert_eq!(restored.get_elapsed_idle_time(), 120);
    assert_eq!(
        restored.get_next_reset_time(),
        Some(save_time + 600),
        "Downtime is part of the idle stretch"
    );
    assert_eq!(run(&mut restored, &clock, 479, false), vec![]);
    assert_eq!(run(&mut restored, &clock, 1, false), vec![TimerEvent::NaturalReset]);
}

#[test]
fn test_restore_after_long_downtime_resets() {
    let (mut timer, clock) = new_timer(50, 600, 60);
    run(&mut timer, &clock, 100, true);
    let overdue = timer.get_total_overdue_time();
    let state = timer.serialize_state();

    clock.advance_secs(3600);
    let mut restored = Timer::new("rest_break", clock.clone());
    restored.set_limit(50);
    restored.set_auto_reset(600);
    restored.enable();
    assert!(restored.deserialize_state(&state, 3));

    assert_eq!(restored.get_elapsed_time(), 0);
    assert_eq!(restored.get_total_overdue_time(), overdue);
    clock.advance_secs(1);
    assert_eq!(
        restored.process(false),
        TimerEvent::NaturalReset,
        "Reset during downtime is reported once"
    );
    assert_eq!(restored.process(false), TimerEvent::None);
}

#[test]
fn test_restore_over_limit_does_not_refire_immediately() {
    let (mut timer, clock) = new_timer(50, 600, 30);
    run(&mut timer, &clock, 60, true);
    let state = timer.serialize_state();

    let mut restored = Timer::new("rest_break", clock.clone());
    restored.set_limit(50);
    restored.set_snooze(30);
    restored.set_auto_reset(600);
    restored.enable();
    assert!(restored.deserialize_state(&state, 3));

    assert!(run(&mut restored, &clock, 29, true).is_empty());
    assert_eq!(run(&mut restored, &clock, 1, true), vec![TimerEvent::LimitReached]);
}

#[test]
fn test_deserialize_older_versions() {
    let clock = Arc::new(ManualTimeSource::new(START));
    let mut timer = Timer::new("micro_pause", clock.clone());
    timer.enable();

    let v2 = format!("{} stopped 120 30 {} {} {}", START, START - 200, START - 50, START - 1000);
    assert!(timer.deserialize_state(&v2, 2));
    assert_eq!(timer.get_elapsed_time(), 120);
    assert_eq!(timer.get_elapsed_idle_time(), 30);
    assert_eq!(timer.get_total_overdue_time(), 0, "Overdue defaults to zero");

    let v1 = format!("{} 75 {}", START, START - 1000);
    assert!(timer.deserialize_state(&v1, 1));
    assert_eq!(timer.get_elapsed_time(), 75);
    assert_eq!(timer.get_state(), TimerState::Stopped);
}

#[test]
fn test_malformed_state_leaves_timer_untouched() {
    let (mut timer, clock) = new_timer(1000, 300, 60);
    run(&mut timer, &clock, 42, true);

    for bad in [
        "",
        "garbage",
        "1700000000 running 1 2 3",
        "1700000000 sleeping 1 2 3 4 5 6",
        "1700000000 running 1 2 3 4 5 x",
    ] {
        assert!(!timer.deserialize_state(bad, 3), "'{}' must be rejected", bad);
    }
    assert!(!timer.deserialize_state("1700000000 running 1 2 3 4 5 6", 99));

    assert_eq!(timer.get_elapsed_time(), 42);
    assert!(timer.is_running());
}
