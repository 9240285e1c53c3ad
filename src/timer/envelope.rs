//! Broadcast Envelope
//!
//! The serialized timer-state message written to the shared store on every
//! transition, specifically to notify sibling contexts. Envelopes are
//! ephemeral: a receiver accepts one only while it is fresh relative to its
//! own clock, so a delayed or replayed write can never drag a tab backwards.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_FRESHNESS_WINDOW_MS;

/// Snapshot of timer state broadcast to sibling contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEnvelope {
    /// Whether the timer is running
    pub running: bool,
    /// Start time in Unix epoch milliseconds, set while running
    pub start_epoch_millis: Option<i64>,
    /// Accumulated elapsed seconds
    pub accumulated_seconds: u64,
    /// Sender's clock at emission, Unix epoch milliseconds
    pub emitted_at_millis: i64,
}

impl BroadcastEnvelope {
    /// Whether this envelope is recent enough to apply.
    ///
    /// An envelope aged exactly the window or more is stale. A receiver whose
    /// clock runs behind the sender's sees a negative age, which is accepted.
    pub fn is_fresh(&self, now_millis: i64, window_ms: i64) -> bool {
        now_millis - self.emitted_at_millis < window_ms
    }

    /// Freshness check with the default 2-second window.
    pub fn is_fresh_default(&self, now_millis: i64) -> bool {
        self.is_fresh(now_millis, DEFAULT_FRESHNESS_WINDOW_MS)
    }

    /// Parse an envelope from its stored JSON form.
    ///
    /// Corrupt payloads are treated as absent, never fatal.
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                tracing::warn!("discarding malformed broadcast envelope: {}", e);
                None
            }
        }
    }

    /// Serialize for the broadcast key.
    pub fn to_json(&self) -> String {
        // Serializing this plain struct cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(emitted_at_millis: i64) -> BroadcastEnvelope {
        BroadcastEnvelope {
            running: true,
            start_epoch_millis: Some(emitted_at_millis),
            accumulated_seconds: 0,
            emitted_at_millis,
        }
    }

    #[test]
    fn test_fresh_within_window() {
        assert!(envelope(10_000).is_fresh_default(10_500));
    }

    #[test]
    fn test_stale_at_window_boundary() {
        assert!(!envelope(10_000).is_fresh_default(12_000));
        assert!(!envelope(10_000).is_fresh_default(12_500));
    }

    #[test]
    fn test_receiver_clock_behind_sender_is_fresh() {
        assert!(envelope(10_000).is_fresh_default(9_000));
    }

    #[test]
    fn test_parse_round_trip() {
        let env = envelope(42);
        assert_eq!(BroadcastEnvelope::parse(&env.to_json()), Some(env));
    }

    #[test]
    fn test_parse_malformed_is_none() {
        assert_eq!(BroadcastEnvelope::parse("{not json"), None);
        assert_eq!(BroadcastEnvelope::parse("[]"), None);
    }
}
