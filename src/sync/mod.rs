//! # Sync Coordinator
//!
//! Periodically and opportunistically exchanges local state with the sync
//! server: pushes a consolidated snapshot of settings and progress, pulls
//! back the authoritative settings, and tracks the server-side study session
//! lifecycle correlated with timer start/stop.
//!
//! ## Backpressure
//!
//! At most one sync request is outstanding per context. A trigger arriving
//! while one is in flight is dropped, not queued; the next periodic tick or
//! user-visible event covers it. Failures of any network call are logged and
//! absorbed locally; the worst case is that displayed settings or statistics
//! lag the server until the next successful cycle.
//!
//! ## Timer integration
//!
//! [`SyncCoordinator::attach_timer`] registers a transition observer on the
//! timer instead of wrapping its methods: the first `Started` after a close
//! opens a study session, and `Paused`/`Reset` ends it, with
//! `timer_started`/`timer_stopped` activity events alongside.

pub mod api;
pub mod scheduler;
pub mod types;

use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::store::{keys, SharedStore};
use crate::timer::{StudyTimer, TimerTransition, TransitionKind};

use api::{ActivityRequest, ApiClient};
use scheduler::SyncScheduler;
use types::{collect_progress, Statistics, SyncSnapshot, UserSettings};

/// Callback receiving the statistics summary of a successful sync.
pub type StatisticsListener = Arc<dyn Fn(&Statistics) + Send + Sync>;

/// Coordinates client-server synchronization for one execution context.
///
/// Cheap to clone; clones share the in-flight guard, the held session id,
/// and the scheduler.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    api: ApiClient,
    store: Arc<dyn SharedStore>,
    clock: Arc<dyn Clock>,
    user_id: String,
    /// At-most-one-concurrent-sync guard
    in_flight: AtomicBool,
    /// The at-most-one open study session held by this context
    session: Mutex<Option<String>>,
    /// Set while a timer-driven session is open or being opened, so repeated
    /// `start` transitions do not open a second one
    session_engaged: AtomicBool,
    scheduler: SyncScheduler,
    statistics_listener: Mutex<Option<StatisticsListener>>,
}

impl SyncCoordinator {
    /// Construct a coordinator.
    ///
    /// User identity: the externally supplied id from the configuration wins;
    /// otherwise the locally persisted identifier is used, created on first
    /// run.
    pub fn new(config: SyncConfig, store: Arc<dyn SharedStore>, clock: Arc<dyn Clock>) -> Self {
        let user_id = resolve_user_id(config.user_id.clone(), store.as_ref());
        let scheduler = SyncScheduler::new(config.sync_interval);
        Self {
            inner: Arc::new(CoordinatorInner {
                api: ApiClient::new(config),
                store,
                clock,
                user_id,
                in_flight: AtomicBool::new(false),
                session: Mutex::new(None),
                session_engaged: AtomicBool::new(false),
                scheduler,
                statistics_listener: Mutex::new(None),
            }),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    /// The study session currently held open by this context, if any.
    pub fn current_session(&self) -> Option<String> {
        self.lock_session().clone()
    }

    /// Register the callback that receives server statistics after a
    /// successful sync.
    pub fn set_statistics_listener(&self, listener: StatisticsListener) {
        *lock_recovering(&self.inner.statistics_listener) = Some(listener);
    }

    /// Push a consolidated snapshot and apply the server's answer.
    ///
    /// Returns `true` when a request was issued and succeeded. A call while
    /// another sync is outstanding is a silent no-op returning `false`.
    /// Failures are logged and leave local state untouched; no retry is
    /// scheduled beyond the next trigger.
    pub async fn sync_all(&self) -> bool {
        let inner = &self.inner;
        if inner
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("sync already in flight, dropping trigger");
            return false;
        }

        let snapshot = SyncSnapshot {
            user_id: inner.user_id.clone(),
            settings: UserSettings::load(inner.store.as_ref()),
            progress: collect_progress(inner.store.as_ref()),
            timestamp: self.timestamp(),
        };
        let result = inner.api.sync(&snapshot).await;
        inner.in_flight.store(false, Ordering::SeqCst);

        match result {
            Ok(response) => {
                if let Some(settings) = response.settings {
                    settings.apply(inner.store.as_ref());
                }
                if let Some(statistics) = response.statistics {
                    if let Some(listener) = lock_recovering(&inner.statistics_listener).as_ref() {
                        listener(&statistics);
                    }
                }
                tracing::debug!("sync cycle completed");
                true
            }
            Err(e) => {
                tracing::warn!("sync failed: {}", e);
                false
            }
        }
    }

    /// One-shot push of a settings object. Does not retry.
    pub async fn save_user_settings(&self, settings: &UserSettings) -> Result<()> {
        self.inner
            .api
            .save_settings(&self.inner.user_id, settings)
            .await?;
        tracing::info!("settings saved to server");
        Ok(())
    }

    /// Pull the authoritative settings snapshot and apply it locally,
    /// overwriting any unsynced local changes.
    pub async fn load_user_settings(&self) -> Result<UserSettings> {
        let settings = self.inner.api.load_settings(&self.inner.user_id).await?;
        settings.apply(self.inner.store.as_ref());
        tracing::info!("settings loaded from server");
        Ok(settings)
    }

    /// Fire-and-forget event append. Failure is logged, never surfaced.
    pub async fn log_activity(
        &self,
        activity_type: &str,
        activity_data: serde_json::Value,
        exam: Option<&str>,
        subject: Option<&str>,
        topic: Option<&str>,
        session_duration: u64,
    ) {
        let request = ActivityRequest {
            user_id: &self.inner.user_id,
            activity_type,
            activity_data,
            exam,
            subject,
            topic,
            session_duration,
        };
        match self.inner.api.log_activity(&request).await {
            Ok(()) => tracing::debug!(activity = activity_type, "activity logged"),
            Err(e) => tracing::warn!(activity = activity_type, "failed to log activity: {}", e),
        }
    }

    /// Open a study session on the server and hold its id.
    pub async fn start_study_session(
        &self,
        exam: &str,
        subject: Option<&str>,
        topic: Option<&str>,
    ) -> Result<String> {
        let session_id = self
            .inner
            .api
            .start_session(&self.inner.user_id, exam, subject, topic)
            .await?;
        tracing::info!(session = %session_id, exam, "study session started");
        *self.lock_session() = Some(session_id.clone());
        Ok(session_id)
    }

    /// Close a study session. Uses the supplied id, falling back to the held
    /// one; with neither, this is a no-op issuing no request and returning
    /// `Ok(None)`. On success returns the server-computed duration in
    /// minutes.
    pub async fn end_study_session(
        &self,
        session_id: Option<String>,
        notes: Option<&str>,
    ) -> Result<Option<u64>> {
        let session_id = match session_id {
            Some(id) => {
                let mut held = self.lock_session();
                if held.as_deref() == Some(id.as_str()) {
                    *held = None;
                }
                id
            }
            None => match self.lock_session().take() {
                Some(id) => id,
                None => return Ok(None),
            },
        };
        let duration = self
            .inner
            .api
            .end_session(&self.inner.user_id, &session_id, notes)
            .await?;
        tracing::info!(session = %session_id, duration, "study session ended");
        Ok(Some(duration))
    }

    /// Register the session-lifecycle hooks on a timer.
    ///
    /// Explicit composition: the timer stays unaware of the server, the
    /// coordinator observes its transitions. Only the first `Started` after a
    /// close opens a session.
    pub fn attach_timer(&self, timer: &mut StudyTimer, exam: &str) {
        let coordinator = self.clone();
        let exam = exam.to_string();
        timer.on_transition(Arc::new(move |transition| {
            coordinator.handle_timer_transition(transition, &exam);
        }));
    }

    fn handle_timer_transition(&self, transition: &TimerTransition, exam: &str) {
        match transition.kind {
            TransitionKind::Started => {
                if self.inner.session_engaged.swap(true, Ordering::SeqCst) {
                    // A session is already open or being opened.
                    return;
                }
                let coordinator = self.clone();
                let exam = exam.to_string();
                let timestamp = self.timestamp();
                tokio::spawn(async move {
                    if let Err(e) = coordinator.start_study_session(&exam, None, None).await {
                        tracing::warn!("failed to start study session: {}", e);
                        coordinator
                            .inner
                            .session_engaged
                            .store(false, Ordering::SeqCst);
                    }
                    coordinator
                        .log_activity(
                            "timer_started",
                            json!({ "timestamp": timestamp }),
                            None,
                            None,
                            None,
                            0,
                        )
                        .await;
                });
            }
            TransitionKind::Paused | TransitionKind::Reset => {
                let elapsed = transition.elapsed_seconds;
                let coordinator = self.clone();
                let timestamp = self.timestamp();
                tokio::spawn(async move {
                    coordinator
                        .inner
                        .session_engaged
                        .store(false, Ordering::SeqCst);
                    match coordinator.end_study_session(None, None).await {
                        Ok(Some(duration)) => {
                            tracing::debug!(duration, "timer stop closed study session")
                        }
                        Ok(None) => {}
                        Err(e) => tracing::warn!("failed to end study session: {}", e),
                    }
                    coordinator
                        .log_activity(
                            "timer_stopped",
                            json!({ "duration": elapsed, "timestamp": timestamp }),
                            None,
                            None,
                            None,
                            elapsed,
                        )
                        .await;
                });
            }
        }
    }

    /// Spawn the periodic sync loop: one immediate cycle, then one per
    /// configured interval until [`SyncCoordinator::stop_periodic`].
    pub fn spawn_periodic(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.inner.scheduler.start().await;
            while coordinator.inner.scheduler.is_active().await {
                if coordinator.inner.scheduler.should_sync().await {
                    coordinator.sync_all().await;
                    coordinator.inner.scheduler.record_sync().await;
                }
                let wait = coordinator
                    .inner
                    .scheduler
                    .time_until_next_sync()
                    .await
                    .unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait.max(Duration::from_millis(100))).await;
            }
        })
    }

    /// Stop the periodic loop after its current iteration.
    pub async fn stop_periodic(&self) {
        self.inner.scheduler.stop().await;
    }

    /// Page-lifecycle trigger: sync when the context becomes visible again.
    pub async fn handle_visibility_change(&self, visible: bool) {
        if visible {
            tracing::debug!("context visible again, syncing");
            self.sync_all().await;
        }
    }

    /// Page-lifecycle trigger: best-effort sync on teardown. May be abandoned
    /// mid-flight; the next context load resyncs.
    pub async fn handle_unload(&self) {
        tracing::debug!("context unloading, best-effort sync");
        self.sync_all().await;
    }

    fn timestamp(&self) -> String {
        chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.inner.clock.now_millis())
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default()
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<String>> {
        lock_recovering(&self.inner.session)
    }
}

fn resolve_user_id(external: Option<String>, store: &dyn SharedStore) -> String {
    if let Some(id) = external {
        return id;
    }
    if let Some(id) = store.get(keys::USER_ID) {
        if !id.is_empty() {
            return id;
        }
    }
    let id = uuid::Uuid::new_v4().to_string();
    store.set(keys::USER_ID, &id);
    tracing::info!(user = %id, "generated local fallback user id");
    id
}

/// Lock a mutex, recovering the guard from a poisoned lock. The values held
/// here (an id, a callback slot) are always left consistent.
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
