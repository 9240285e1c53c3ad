//! Sync Scheduler
//!
//! Cadence bookkeeping for the background sync loop: a fixed base interval,
//! with the very first check always due so a freshly constructed coordinator
//! syncs immediately. Opportunistic triggers (visibility, unload) bypass the
//! scheduler entirely and do not reset the periodic cadence.

use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Synchronization scheduler
#[derive(Debug)]
pub struct SyncScheduler {
    /// Last periodic sync time
    last_sync: RwLock<Option<Instant>>,
    /// Fixed period between syncs
    interval: Duration,
    /// Whether scheduler is active
    is_active: RwLock<bool>,
}

impl SyncScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_sync: RwLock::new(None),
            interval,
            is_active: RwLock::new(false),
        }
    }

    /// Start the scheduler
    pub async fn start(&self) {
        *self.is_active.write().await = true;
    }

    /// Stop the scheduler
    pub async fn stop(&self) {
        *self.is_active.write().await = false;
    }

    pub async fn is_active(&self) -> bool {
        *self.is_active.read().await
    }

    /// Check if a periodic sync is due now
    pub async fn should_sync(&self) -> bool {
        if !*self.is_active.read().await {
            return false;
        }

        match *self.last_sync.read().await {
            Some(time) => time.elapsed() >= self.interval,
            None => true, // First sync
        }
    }

    /// Record a periodic sync attempt
    pub async fn record_sync(&self) {
        *self.last_sync.write().await = Some(Instant::now());
    }

    /// Time until the next periodic sync is due
    pub async fn time_until_next_sync(&self) -> Option<Duration> {
        let last_sync = (*self.last_sync.read().await)?;

        let elapsed = last_sync.elapsed();
        if elapsed >= self.interval {
            Some(Duration::ZERO)
        } else {
            Some(self.interval - elapsed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scheduler_start_stop() {
        let scheduler = SyncScheduler::new(Duration::from_secs(30));
        assert!(!scheduler.is_active().await);

        scheduler.start().await;
        assert!(scheduler.is_active().await);

        scheduler.stop().await;
        assert!(!scheduler.is_active().await);
    }

    #[tokio::test]
    async fn test_should_sync_initially() {
        let scheduler = SyncScheduler::new(Duration::from_secs(30));
        scheduler.start().await;

        // Should sync initially (no previous sync)
        assert!(scheduler.should_sync().await);
    }

    #[tokio::test]
    async fn test_should_not_sync_right_after_record() {
        let scheduler = SyncScheduler::new(Duration::from_secs(30));
        scheduler.start().await;

        scheduler.record_sync().await;
        assert!(!scheduler.should_sync().await);
        assert!(scheduler.time_until_next_sync().await.unwrap() > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_inactive_scheduler_never_syncs() {
        let scheduler = SyncScheduler::new(Duration::from_secs(30));
        assert!(!scheduler.should_sync().await);
    }
}
