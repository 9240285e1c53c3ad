//! Wall-Clock Abstraction
//!
//! The timer and the sync coordinator both reason about wall-clock time:
//! elapsed-time arithmetic, the broadcast freshness gate, and the daily
//! rollover all compare against "now". This module puts that behind a trait
//! so tests can drive time explicitly instead of sleeping.

use chrono::{Local, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current Unix time in milliseconds.
    fn now_millis(&self) -> i64;

    /// Current calendar date, used for the daily rollover comparison.
    fn today(&self) -> NaiveDate;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually driven clock for tests.
///
/// `today()` derives the date from the held millisecond value, so advancing
/// past midnight moves the calendar date as well.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_millis),
        }
    }

    /// Set the absolute time.
    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Move time forward.
    pub fn advance_millis(&self, delta: i64) {
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }

    /// Move time forward by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance_millis(secs * 1000);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    fn today(&self) -> NaiveDate {
        let millis = self.now_millis();
        Utc.timestamp_millis_opt(millis)
            .single()
            .map(|dt| dt.date_naive())
            .unwrap_or_default()
    }
}
