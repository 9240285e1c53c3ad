//! Common test utilities and helpers

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use studysync::clock::ManualClock;
use studysync::store::MemoryStore;
use studysync::SyncConfig;

/// Fixed test epoch: 2025-08-24T02:26:40Z, comfortably inside a calendar day.
pub const T0: i64 = 1_756_000_000_000;

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(T0))
}

pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Coordinator config pointed at a mock server, with a fixed user identity.
pub fn config(server_url: &str) -> SyncConfig {
    SyncConfig::builder()
        .server_url(server_url.to_string())
        .user_id("test-user".to_string())
        .build()
        .expect("valid test config")
}

/// Same, with a short periodic interval for loop tests.
pub fn config_with_interval(server_url: &str, interval: Duration) -> SyncConfig {
    SyncConfig::builder()
        .server_url(server_url.to_string())
        .user_id("test-user".to_string())
        .sync_interval(interval)
        .build()
        .expect("valid test config")
}
