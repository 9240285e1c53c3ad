//! Canonical store keys.
//!
//! Every context of the same store agrees on these names; they are the whole
//! shared surface between tabs.

/// Timer running flag ("true"/"false")
pub const TIMER_RUNNING: &str = "studysync_timer_running";

/// Timer start time, Unix epoch milliseconds
pub const TIMER_START: &str = "studysync_timer_start";

/// Accumulated elapsed seconds
pub const TIMER_ELAPSED: &str = "studysync_timer_elapsed";

/// Calendar date of the last persist, ISO `YYYY-MM-DD`
pub const TIMER_LAST_DATE: &str = "studysync_last_date";

/// Broadcast envelope written on every timer transition
pub const TIMER_BROADCAST: &str = "studysync_timer_broadcast";

/// Locally persisted fallback user identity
pub const USER_ID: &str = "studysync_user_id";

/// Per-exam progress entries live under this prefix, keyed by exam id
pub const PROGRESS_PREFIX: &str = "studysync_progress_";

/// User settings
pub const STUDY_REMINDERS: &str = "studysync_study_reminders";
pub const DARK_MODE: &str = "studysync_dark_mode";
pub const PRIVACY_MODE: &str = "studysync_privacy_mode";
pub const NOTIFICATION_PREFERENCES: &str = "studysync_notification_preferences";
pub const THEME_PREFERENCES: &str = "studysync_theme_preferences";
pub const STUDY_SCHEDULE: &str = "studysync_study_schedule";

/// Build the progress key for an exam id.
pub fn progress_key(exam_id: &str) -> String {
    format!("{PROGRESS_PREFIX}{exam_id}")
}

/// Extract the exam id from a progress key, if it is one.
pub fn exam_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(PROGRESS_PREFIX)
}
