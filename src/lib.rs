//! StudySync - Main Library
//!
//! StudySync keeps a single logical "elapsed study time" counter consistent
//! across multiple execution contexts (browser-tab-like peers) and reconciles
//! locally accumulated state with a remote server.
//!
//! # Overview
//!
//! This library provides the core functionality for StudySync, including:
//! - A running/paused/stopped study timer persisted to a shared key-value store
//! - Cross-context convergence via broadcast envelopes with a freshness gate
//! - Periodic and opportunistic client-server synchronization
//! - Server-tracked study session lifecycle correlated with timer activity
//!
//! # Module Structure
//!
//! - **`store`** - The shared key-value store abstraction and its in-memory
//!   implementation with write notifications
//! - **`timer`** - The timer state machine, broadcast envelope, cross-tab
//!   reconciler, and display tick
//! - **`sync`** - The sync coordinator, HTTP API client, wire types, and
//!   scheduler
//! - **`clock`** - Wall-clock seam so time-dependent behavior is testable
//! - **`config`** / **`error`** - Configuration and error types
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//! use studysync::clock::SystemClock;
//! use studysync::store::MemoryStore;
//! use studysync::sync::SyncCoordinator;
//! use studysync::timer::StudyTimer;
//! use studysync::SyncConfig;
//!
//! # async fn example() -> Result<(), studysync::ConfigError> {
//! let store = Arc::new(MemoryStore::new());
//! let clock = Arc::new(SystemClock);
//!
//! let mut timer = StudyTimer::new(store.clone(), clock.clone());
//! timer.restore();
//!
//! let config = SyncConfig::builder()
//!     .server_url("https://study.example.com".to_string())
//!     .build()?;
//! let coordinator = SyncCoordinator::new(config, store, clock);
//! coordinator.attach_timer(&mut timer, "General Study");
//!
//! let timer = Arc::new(Mutex::new(timer));
//! let _periodic = coordinator.spawn_periodic();
//! timer.lock().await.start();
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! Within one context, timer transitions are strictly sequential. Across
//! contexts the only guarantee is "last accepted broadcast wins within a
//! 2-second freshness window". At most one sync request is outstanding per
//! context; excess triggers are dropped, not queued.

/// Wall-clock abstraction
pub mod clock;

/// Coordinator configuration
pub mod config;

/// Error types
pub mod error;

/// Shared key-value store with write notifications
pub mod store;

/// Client-server synchronization
pub mod sync;

/// Timer state machine and cross-tab reconciliation
pub mod timer;

/// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, SyncConfig, SyncConfigBuilder};
pub use error::SyncError;
pub use store::{MemoryStore, SharedStore, StoreEvent};
pub use sync::types::{Statistics, SyncSnapshot, UserSettings};
pub use sync::SyncCoordinator;
pub use timer::{
    BroadcastEnvelope, DisplayTick, StudyTimer, TabReconciler, TimerState, TimerTransition,
    TransitionKind,
};
