//! # Timer State Machine
//!
//! Owns the single running/paused/stopped study counter for one execution
//! context. Every transition persists the canonical state to the shared
//! store, emits a broadcast envelope for sibling contexts, and notifies
//! registered transition observers.
//!
//! ## State model
//!
//! While running, elapsed time derives solely from the rebased start instant:
//! `start` sets `start_epoch_millis = now - accumulated * 1000`, so the prior
//! accumulated seconds are already baked into the start and
//! `elapsed = (now - start) / 1000` is uniform. `pause` folds the running
//! interval back into `accumulated_seconds` by assignment.
//!
//! ## Persistence policy
//!
//! The store copy is derived from the last transition, never a second source
//! of truth. The 1-second display tick recomputes the shown value without
//! touching persisted state; a final persist on drop covers teardown paths.
//!
//! ## Daily rollover
//!
//! On restore, a persisted date different from today forces a reset before
//! anything else observes state. Stale accumulated time never leaks across a
//! day boundary.

pub mod envelope;
pub mod reconciler;

pub use envelope::BroadcastEnvelope;
pub use reconciler::TabReconciler;

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::store::{keys, SharedStore};

/// A timer shared between the UI wiring, the reconciler task, and the
/// display tick.
pub type SharedTimer = Arc<Mutex<StudyTimer>>;

/// Canonical timer state for one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    /// Whether the counter is advancing
    pub running: bool,
    /// Rebased start instant, set exactly when `running` is true
    pub start_epoch_millis: Option<i64>,
    /// Folded elapsed seconds, authoritative while not running
    pub accumulated_seconds: u64,
    /// Calendar date of the last persist
    pub last_persisted_date: NaiveDate,
}

/// Kind of timer transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Started,
    Paused,
    Reset,
}

/// Notification delivered to transition observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerTransition {
    pub kind: TransitionKind,
    /// Elapsed seconds at the moment of the transition (captured before a
    /// reset zeroes the counter)
    pub elapsed_seconds: u64,
}

/// Callback registered for timer transitions.
pub type TransitionObserver = Arc<dyn Fn(&TimerTransition) + Send + Sync>;

/// The timer state machine.
///
/// Exactly one instance per execution context holds the authoritative
/// in-memory state; the shared store carries the durable/transport copy.
pub struct StudyTimer {
    store: Arc<dyn SharedStore>,
    clock: Arc<dyn Clock>,
    state: TimerState,
    observers: Vec<TransitionObserver>,
}

impl std::fmt::Debug for StudyTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudyTimer")
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl StudyTimer {
    pub fn new(store: Arc<dyn SharedStore>, clock: Arc<dyn Clock>) -> Self {
        let today = clock.today();
        Self {
            store,
            clock,
            state: TimerState {
                running: false,
                start_epoch_millis: None,
                accumulated_seconds: 0,
                last_persisted_date: today,
            },
            observers: Vec::new(),
        }
    }

    /// Register a transition observer. Observers run synchronously inside the
    /// transition, after the state has been persisted and broadcast.
    pub fn on_transition(&mut self, observer: TransitionObserver) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Current elapsed seconds.
    pub fn elapsed_seconds(&self) -> u64 {
        match (self.state.running, self.state.start_epoch_millis) {
            (true, Some(start)) => {
                let delta = self.clock.now_millis() - start;
                (delta.max(0) / 1000) as u64
            }
            _ => self.state.accumulated_seconds,
        }
    }

    /// Elapsed time formatted as `HH:MM:SS`.
    pub fn formatted_elapsed(&self) -> String {
        format_hms(self.elapsed_seconds())
    }

    /// Today's study time summary.
    pub fn today_stats(&self) -> TodayStats {
        TodayStats::from_seconds(self.elapsed_seconds())
    }

    /// Transition to `Running`. No-op if already running.
    pub fn start(&mut self) {
        if self.state.running {
            return;
        }
        let now = self.clock.now_millis();
        self.state.running = true;
        self.state.start_epoch_millis = Some(now - self.state.accumulated_seconds as i64 * 1000);
        tracing::debug!(accumulated = self.state.accumulated_seconds, "timer started");
        self.commit(TransitionKind::Started);
    }

    /// Transition to `Paused`, folding the running interval into
    /// `accumulated_seconds`. No-op if not running.
    pub fn pause(&mut self) {
        if !self.state.running {
            return;
        }
        self.state.accumulated_seconds = self.elapsed_seconds();
        self.state.running = false;
        self.state.start_epoch_millis = None;
        tracing::debug!(accumulated = self.state.accumulated_seconds, "timer paused");
        self.commit(TransitionKind::Paused);
    }

    /// Transition to `Stopped`, zeroing the counter. Valid from any state.
    pub fn reset(&mut self) {
        let elapsed = self.elapsed_seconds();
        self.state.running = false;
        self.state.start_epoch_millis = None;
        self.state.accumulated_seconds = 0;
        tracing::debug!(discarded = elapsed, "timer reset");
        self.commit_with_elapsed(TransitionKind::Reset, elapsed);
    }

    /// Restore state from the shared store.
    ///
    /// Rollover first: a persisted date other than today forces a reset.
    /// Otherwise, a persisted running timer is assumed to have kept running
    /// while the context was closed, so the accumulated seconds are
    /// recomputed from the persisted start instant.
    pub fn restore(&mut self) {
        let today = self.clock.today();
        let persisted_date = self
            .store
            .get(keys::TIMER_LAST_DATE)
            .and_then(|raw| raw.parse::<NaiveDate>().ok());
        if persisted_date != Some(today) {
            tracing::info!("persisted timer state is from another day, resetting");
            self.reset();
            return;
        }

        let running = self
            .store
            .get(keys::TIMER_RUNNING)
            .map(|raw| raw == "true")
            .unwrap_or(false);
        let start = self
            .store
            .get(keys::TIMER_START)
            .and_then(|raw| raw.parse::<i64>().ok());
        let accumulated = self
            .store
            .get(keys::TIMER_ELAPSED)
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(0);

        self.state.last_persisted_date = today;
        self.state.accumulated_seconds = accumulated;
        if running {
            if let Some(start) = start {
                // Assume-still-running policy: count the closed interval too.
                let now = self.clock.now_millis();
                self.state.running = true;
                self.state.start_epoch_millis = Some(start);
                self.state.accumulated_seconds = ((now - start).max(0) / 1000) as u64;
                return;
            }
            tracing::warn!("persisted running flag without a start time, treating as paused");
        }
        self.state.running = false;
        self.state.start_epoch_millis = None;
    }

    /// Overwrite local state from an accepted broadcast envelope.
    ///
    /// Last-writer-wins: fields are replaced wholesale. The receiving context
    /// does not re-persist or re-broadcast, so envelopes cannot echo forever.
    pub fn apply_envelope(&mut self, envelope: &BroadcastEnvelope) {
        self.state.running = envelope.running;
        self.state.start_epoch_millis = envelope.start_epoch_millis;
        self.state.accumulated_seconds = envelope.accumulated_seconds;
    }

    /// Persist the canonical state without broadcasting. Used on teardown.
    pub fn persist(&mut self) {
        let today = self.clock.today();
        self.state.last_persisted_date = today;
        self.store.set(
            keys::TIMER_RUNNING,
            if self.state.running { "true" } else { "false" },
        );
        match self.state.start_epoch_millis {
            Some(start) => self.store.set(keys::TIMER_START, &start.to_string()),
            None => self.store.remove(keys::TIMER_START),
        }
        self.store.set(
            keys::TIMER_ELAPSED,
            &self.state.accumulated_seconds.to_string(),
        );
        self.store.set(keys::TIMER_LAST_DATE, &today.to_string());
    }

    fn commit(&mut self, kind: TransitionKind) {
        let elapsed = self.elapsed_seconds();
        self.commit_with_elapsed(kind, elapsed);
    }

    fn commit_with_elapsed(&mut self, kind: TransitionKind, elapsed_seconds: u64) {
        self.persist();
        self.broadcast();
        let transition = TimerTransition {
            kind,
            elapsed_seconds,
        };
        for observer in &self.observers {
            observer(&transition);
        }
    }

    fn broadcast(&self) {
        let envelope = BroadcastEnvelope {
            running: self.state.running,
            start_epoch_millis: self.state.start_epoch_millis,
            accumulated_seconds: self.state.accumulated_seconds,
            emitted_at_millis: self.clock.now_millis(),
        };
        self.store.set(keys::TIMER_BROADCAST, &envelope.to_json());
    }
}

impl Drop for StudyTimer {
    fn drop(&mut self) {
        // Final persist on all exit paths.
        self.persist();
    }
}

/// Today's study time summary, as surfaced to the hosting UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayStats {
    pub total_seconds: u64,
    pub hours: u64,
    pub minutes: u64,
    pub formatted: String,
}

impl TodayStats {
    pub fn from_seconds(total_seconds: u64) -> Self {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        Self {
            total_seconds,
            hours,
            minutes,
            formatted: format_hm(total_seconds),
        }
    }
}

/// Format seconds as `HH:MM:SS`.
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Format seconds as `Xh Ym`.
pub fn format_hm(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Callback invoked with the formatted elapsed value on every tick.
pub type DisplayCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Periodic display refresh for a running timer.
///
/// Recomputes the displayed elapsed time on a 1-second cadence without
/// mutating persisted state. Started and stopped by the reconciler (and the
/// local wiring) as the running flag changes.
pub struct DisplayTick {
    timer: SharedTimer,
    callback: DisplayCallback,
    period: Duration,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl DisplayTick {
    pub fn new(timer: SharedTimer, callback: DisplayCallback) -> Self {
        Self::with_period(timer, callback, crate::config::DEFAULT_TICK_INTERVAL)
    }

    pub fn with_period(timer: SharedTimer, callback: DisplayCallback, period: Duration) -> Self {
        Self {
            timer,
            callback,
            period,
            handle: None,
        }
    }

    /// Start ticking. Any previous tick task is stopped first.
    pub fn start(&mut self) {
        self.stop();
        let timer = Arc::clone(&self.timer);
        let callback = Arc::clone(&self.callback);
        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let formatted = timer.lock().await.formatted_elapsed();
                callback(&formatted);
            }
        }));
    }

    /// Stop ticking.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Push one display refresh immediately, e.g. after a pause.
    pub async fn refresh(&self) {
        let formatted = self.timer.lock().await.formatted_elapsed();
        (self.callback)(&formatted);
    }

    pub fn is_ticking(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for DisplayTick {
    fn drop(&mut self) {
        self.stop();
    }
}
