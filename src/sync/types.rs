//! Wire Types
//!
//! Request and response bodies exchanged with the sync server, plus the
//! conversions between [`UserSettings`] and its per-key representation in
//! the shared store. All wire names are snake_case.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::store::{keys, SharedStore};

/// Named user preferences.
///
/// Server wins: both the explicit settings load and a successful sync cycle
/// overwrite the local view wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub study_reminders: bool,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub privacy_mode: bool,
    #[serde(default)]
    pub notification_preferences: Map<String, Value>,
    #[serde(default)]
    pub theme_preferences: Map<String, Value>,
    #[serde(default)]
    pub study_schedule: Map<String, Value>,
}

impl UserSettings {
    /// Gather settings from the shared store. Absent or malformed values read
    /// as defaults.
    pub fn load(store: &dyn SharedStore) -> Self {
        Self {
            study_reminders: load_bool(store, keys::STUDY_REMINDERS),
            dark_mode: load_bool(store, keys::DARK_MODE),
            privacy_mode: load_bool(store, keys::PRIVACY_MODE),
            notification_preferences: load_map(store, keys::NOTIFICATION_PREFERENCES),
            theme_preferences: load_map(store, keys::THEME_PREFERENCES),
            study_schedule: load_map(store, keys::STUDY_SCHEDULE),
        }
    }

    /// Overwrite the local settings keys with this snapshot.
    pub fn apply(&self, store: &dyn SharedStore) {
        store.set(keys::STUDY_REMINDERS, bool_str(self.study_reminders));
        store.set(keys::DARK_MODE, bool_str(self.dark_mode));
        store.set(keys::PRIVACY_MODE, bool_str(self.privacy_mode));
        store.set(
            keys::NOTIFICATION_PREFERENCES,
            &map_json(&self.notification_preferences),
        );
        store.set(keys::THEME_PREFERENCES, &map_json(&self.theme_preferences));
        store.set(keys::STUDY_SCHEDULE, &map_json(&self.study_schedule));
    }
}

fn load_bool(store: &dyn SharedStore, key: &str) -> bool {
    store.get(key).map(|raw| raw == "true").unwrap_or(false)
}

fn load_map(store: &dyn SharedStore, key: &str) -> Map<String, Value> {
    store
        .get(key)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn map_json(map: &Map<String, Value>) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}

/// Completion state of one syllabus topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicProgress {
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<String>,
}

/// subjectId -> topicId -> completion
pub type ExamProgress = HashMap<String, HashMap<String, TopicProgress>>;

/// examId -> per-exam progress
pub type ProgressMap = HashMap<String, ExamProgress>;

/// Gather all locally persisted per-exam progress entries.
///
/// Progress is write-only from client to server: the sync response never
/// overwrites it. Malformed entries are skipped with a warning.
pub fn collect_progress(store: &dyn SharedStore) -> ProgressMap {
    let mut progress = ProgressMap::new();
    for key in store.keys() {
        let Some(exam_id) = keys::exam_id_from_key(&key) else {
            continue;
        };
        let Some(raw) = store.get(&key) else { continue };
        match serde_json::from_str::<ExamProgress>(&raw) {
            Ok(exam_progress) => {
                progress.insert(exam_id.to_string(), exam_progress);
            }
            Err(e) => {
                tracing::warn!(exam = exam_id, "skipping malformed progress entry: {}", e);
            }
        }
    }
    progress
}

/// Consolidated snapshot pushed wholesale on every sync cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub user_id: String,
    pub settings: UserSettings,
    pub progress: ProgressMap,
    /// RFC 3339 client timestamp
    pub timestamp: String,
}

/// Aggregate statistics computed server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Total study time in minutes
    #[serde(default)]
    pub total_study_time: u64,
    #[serde(default)]
    pub study_streak: u32,
    #[serde(default)]
    pub completed_topics: u32,
    #[serde(default)]
    pub total_exams: u32,
    #[serde(default)]
    pub recent_sessions: u32,
}

/// Response to a sync push. Both fields override the client's local view
/// when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncResponse {
    #[serde(default)]
    pub settings: Option<UserSettings>,
    #[serde(default)]
    pub statistics: Option<Statistics>,
}
