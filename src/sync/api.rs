//! HTTP API Client
//!
//! Typed wrappers over the server endpoints. The server is an opaque
//! external collaborator; this module owns only the request/response shapes
//! and status handling. Non-2xx answers surface as [`SyncError::Status`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::sync::types::{SyncResponse, SyncSnapshot, UserSettings};

/// Client for the user-data endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: SyncConfig,
}

#[derive(Debug, Serialize)]
struct SettingsRequest<'a> {
    user_id: &'a str,
    settings: &'a UserSettings,
}

#[derive(Debug, Deserialize)]
struct SettingsResponse {
    settings: UserSettings,
}

#[derive(Debug, Serialize)]
pub struct ActivityRequest<'a> {
    pub user_id: &'a str,
    pub activity_type: &'a str,
    pub activity_data: Value,
    pub exam: Option<&'a str>,
    pub subject: Option<&'a str>,
    pub topic: Option<&'a str>,
    pub session_duration: u64,
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    action: &'a str,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exam: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SessionStarted {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct SessionEnded {
    /// Session duration in minutes
    duration: u64,
}

impl ApiClient {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// POST `/api/user/sync`
    pub async fn sync(&self, snapshot: &SyncSnapshot) -> Result<SyncResponse> {
        let response = self
            .http
            .post(self.config.api_url("/api/user/sync"))
            .json(snapshot)
            .send()
            .await?;
        let response = check_status(response)?;
        Ok(response.json().await?)
    }

    /// POST `/api/user/settings`
    pub async fn save_settings(&self, user_id: &str, settings: &UserSettings) -> Result<()> {
        let response = self
            .http
            .post(self.config.api_url("/api/user/settings"))
            .json(&SettingsRequest { user_id, settings })
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }

    /// GET `/api/user/settings?user_id=...`
    pub async fn load_settings(&self, user_id: &str) -> Result<UserSettings> {
        let response = self
            .http
            .get(self.config.api_url("/api/user/settings"))
            .query(&[("user_id", user_id)])
            .send()
            .await?;
        let response = check_status(response)?;
        let body: SettingsResponse = response.json().await?;
        Ok(body.settings)
    }

    /// POST `/api/user/activity`. No response body required.
    pub async fn log_activity(&self, request: &ActivityRequest<'_>) -> Result<()> {
        let response = self
            .http
            .post(self.config.api_url("/api/user/activity"))
            .json(request)
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }

    /// POST `/api/user/study-session` with `action: "start"`.
    pub async fn start_session(
        &self,
        user_id: &str,
        exam: &str,
        subject: Option<&str>,
        topic: Option<&str>,
    ) -> Result<String> {
        let response = self
            .http
            .post(self.config.api_url("/api/user/study-session"))
            .json(&SessionRequest {
                action: "start",
                user_id,
                exam: Some(exam),
                subject,
                topic,
                session_id: None,
                notes: None,
            })
            .send()
            .await?;
        let response = check_status(response)?;
        let body: SessionStarted = response.json().await?;
        Ok(body.session_id)
    }

    /// POST `/api/user/study-session` with `action: "end"`. Returns the
    /// server-computed duration in minutes.
    pub async fn end_session(
        &self,
        user_id: &str,
        session_id: &str,
        notes: Option<&str>,
    ) -> Result<u64> {
        let response = self
            .http
            .post(self.config.api_url("/api/user/study-session"))
            .json(&SessionRequest {
                action: "end",
                user_id,
                exam: None,
                subject: None,
                topic: None,
                session_id: Some(session_id),
                notes,
            })
            .send()
            .await?;
        let response = check_status(response)?;
        let body: SessionEnded = response.json().await?;
        Ok(body.duration)
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(SyncError::Status(response.status()))
    }
}
