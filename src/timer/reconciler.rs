//! Cross-Tab Reconciler
//!
//! Subscribes to shared-store change notifications and applies fresh
//! broadcast envelopes onto this context's timer, last-writer-wins. All open
//! contexts converge to the same displayed value within one broadcast
//! round-trip; two contexts racing inside the freshness window converge to
//! whichever write each receiver observes last, which is the accepted
//! resolution for a single human operating one tab at a time.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::clock::Clock;
use crate::store::{keys, SharedStore};
use crate::timer::{BroadcastEnvelope, DisplayTick, SharedTimer, StudyTimer};

/// Background task reconciling this context's timer with sibling broadcasts.
pub struct TabReconciler {
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TabReconciler {
    /// Parse and gate one raw broadcast payload, applying it when fresh.
    ///
    /// Returns whether the envelope was applied. Stale or malformed payloads
    /// are discarded without touching the timer.
    pub fn accept(
        timer: &mut StudyTimer,
        raw: &str,
        now_millis: i64,
        freshness_window_ms: i64,
    ) -> bool {
        let Some(envelope) = BroadcastEnvelope::parse(raw) else {
            return false;
        };
        if !envelope.is_fresh(now_millis, freshness_window_ms) {
            tracing::debug!(
                age_ms = now_millis - envelope.emitted_at_millis,
                "discarding stale broadcast envelope"
            );
            return false;
        }
        timer.apply_envelope(&envelope);
        true
    }

    /// Spawn the reconciler for one context.
    ///
    /// Takes ownership of the context's display tick so the incoming running
    /// flag can start or stop it. The tick is seeded from the timer's current
    /// state, covering a restore that found a running timer.
    pub fn spawn(
        timer: SharedTimer,
        store: Arc<dyn SharedStore>,
        clock: Arc<dyn Clock>,
        mut tick: DisplayTick,
        freshness_window_ms: i64,
    ) -> Self {
        let mut events = store.subscribe();
        let handle = tokio::spawn(async move {
            if timer.lock().await.is_running() {
                tick.start();
            }
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(missed)) => {
                        // Missed envelopes are already stale by definition of
                        // last-writer-wins; keep consuming.
                        tracing::warn!(missed, "reconciler lagged behind store events");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if event.key != keys::TIMER_BROADCAST {
                    continue;
                }
                let Some(raw) = event.value else { continue };

                let running = {
                    let mut timer = timer.lock().await;
                    if !Self::accept(&mut timer, &raw, clock.now_millis(), freshness_window_ms) {
                        continue;
                    }
                    timer.is_running()
                };
                if running {
                    tick.start();
                } else {
                    tick.stop();
                    tick.refresh().await;
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Stop listening for broadcasts.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TabReconciler {
    fn drop(&mut self) {
        self.stop();
    }
}
