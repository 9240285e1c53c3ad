//! Timer state machine tests: transition semantics, persistence, daily
//! rollover, and crash recovery.

mod common;

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use studysync::clock::Clock;
use studysync::store::{keys, SharedStore};
use studysync::timer::{BroadcastEnvelope, StudyTimer, TransitionKind};

#[test]
fn pause_is_idempotent() {
    let store = common::store();
    let clock = common::clock();
    let mut timer = StudyTimer::new(store, clock.clone());

    timer.start();
    clock.advance_secs(10);
    timer.pause();
    let once = timer.state().clone();

    timer.pause();
    assert_eq!(timer.state(), &once);
}

#[test]
fn start_pause_round_trip() {
    let store = common::store();
    let clock = common::clock();
    let mut timer = StudyTimer::new(store, clock.clone());

    timer.start();
    clock.advance_secs(65);
    timer.pause();
    assert_eq!(timer.state().accumulated_seconds, 65);
    assert_eq!(timer.formatted_elapsed(), "00:01:05");

    // Resuming rebases the start so the fold stays cumulative.
    timer.start();
    clock.advance_secs(60);
    assert_eq!(timer.elapsed_seconds(), 125);
    timer.pause();
    assert_eq!(timer.state().accumulated_seconds, 125);
    assert_eq!(timer.formatted_elapsed(), "00:02:05");
}

#[test]
fn start_while_running_is_a_no_op() {
    let store = common::store();
    let clock = common::clock();
    let mut timer = StudyTimer::new(store, clock.clone());

    timer.start();
    clock.advance_secs(30);
    let before = timer.state().clone();
    timer.start();
    assert_eq!(timer.state(), &before);
    assert_eq!(timer.elapsed_seconds(), 30);
}

#[test]
fn reset_zeroes_from_any_state() {
    let store = common::store();
    let clock = common::clock();
    let mut timer = StudyTimer::new(store, clock.clone());

    timer.start();
    clock.advance_secs(40);
    timer.reset();
    assert!(!timer.is_running());
    assert_eq!(timer.elapsed_seconds(), 0);
    assert_eq!(timer.state().start_epoch_millis, None);
}

#[test]
fn transitions_persist_and_broadcast() {
    let store = common::store();
    let clock = common::clock();
    let mut timer = StudyTimer::new(store.clone(), clock.clone());

    timer.start();
    assert_eq!(store.get(keys::TIMER_RUNNING).as_deref(), Some("true"));
    assert!(store.get(keys::TIMER_START).is_some());
    assert!(store.get(keys::TIMER_LAST_DATE).is_some());

    let raw = store.get(keys::TIMER_BROADCAST).expect("broadcast written");
    let envelope = BroadcastEnvelope::parse(&raw).expect("valid envelope");
    assert!(envelope.running);
    assert_eq!(envelope.emitted_at_millis, clock.now_millis());

    clock.advance_secs(5);
    timer.pause();
    assert_eq!(store.get(keys::TIMER_RUNNING).as_deref(), Some("false"));
    assert_eq!(store.get(keys::TIMER_START), None);
    assert_eq!(store.get(keys::TIMER_ELAPSED).as_deref(), Some("5"));
}

#[test]
fn daily_rollover_resets_before_state_is_observed() {
    let store = common::store();
    let clock = common::clock();
    let yesterday = clock.today().pred_opt().expect("valid date");

    store.set(keys::TIMER_LAST_DATE, &yesterday.to_string());
    store.set(keys::TIMER_ELAPSED, "3600");
    store.set(keys::TIMER_RUNNING, "false");

    let mut timer = StudyTimer::new(store.clone(), clock);
    timer.restore();

    assert_eq!(timer.state().accumulated_seconds, 0);
    assert!(!timer.is_running());
    // The forced reset also rewrote the store copy.
    assert_eq!(store.get(keys::TIMER_ELAPSED).as_deref(), Some("0"));
}

#[test]
fn restore_assumes_timer_kept_running() {
    let store = common::store();
    let clock = common::clock();

    store.set(keys::TIMER_LAST_DATE, &clock.today().to_string());
    store.set(keys::TIMER_RUNNING, "true");
    store.set(keys::TIMER_START, &(common::T0 - 90_000).to_string());
    store.set(keys::TIMER_ELAPSED, "5");

    let mut timer = StudyTimer::new(store, clock.clone());
    timer.restore();

    assert!(timer.is_running());
    assert_eq!(timer.state().accumulated_seconds, 90);
    assert_eq!(timer.elapsed_seconds(), 90);

    clock.advance_secs(10);
    assert_eq!(timer.elapsed_seconds(), 100);
}

#[test]
fn restore_with_malformed_values_reads_defaults() {
    let store = common::store();
    let clock = common::clock();

    store.set(keys::TIMER_LAST_DATE, &clock.today().to_string());
    store.set(keys::TIMER_RUNNING, "maybe");
    store.set(keys::TIMER_ELAPSED, "garbage");

    let mut timer = StudyTimer::new(store, clock);
    timer.restore();

    assert!(!timer.is_running());
    assert_eq!(timer.state().accumulated_seconds, 0);
}

#[test]
fn restore_running_without_start_is_paused() {
    let store = common::store();
    let clock = common::clock();

    store.set(keys::TIMER_LAST_DATE, &clock.today().to_string());
    store.set(keys::TIMER_RUNNING, "true");
    store.set(keys::TIMER_ELAPSED, "120");

    let mut timer = StudyTimer::new(store, clock);
    timer.restore();

    assert!(!timer.is_running());
    assert_eq!(timer.state().accumulated_seconds, 120);
}

#[test]
fn observers_see_each_transition() {
    let store = common::store();
    let clock = common::clock();
    let mut timer = StudyTimer::new(store, clock.clone());

    let seen: Arc<Mutex<Vec<(TransitionKind, u64)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    timer.on_transition(Arc::new(move |transition| {
        sink.lock()
            .unwrap()
            .push((transition.kind, transition.elapsed_seconds));
    }));

    timer.start();
    clock.advance_secs(7);
    timer.pause();
    timer.start();
    clock.advance_secs(3);
    timer.reset();

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            (TransitionKind::Started, 0),
            (TransitionKind::Paused, 7),
            (TransitionKind::Started, 7),
            (TransitionKind::Reset, 10),
        ]
    );
}

#[test]
fn dropping_the_timer_persists_final_state() {
    let store = common::store();
    let clock = common::clock();
    {
        let mut timer = StudyTimer::new(store.clone(), clock.clone());
        timer.start();
        clock.advance_secs(12);
        // No explicit pause or persist; the drop covers teardown.
    }
    assert_eq!(store.get(keys::TIMER_RUNNING).as_deref(), Some("true"));
    let start: i64 = store.get(keys::TIMER_START).unwrap().parse().unwrap();
    assert_eq!(start, common::T0);
}
