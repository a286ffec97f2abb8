//! Completion notifier — fires a one-shot "new completed profile" event
//! when the completion flag crosses `false → true` in a single update.
//!
//! Delivery is fire-and-forget: a failed or slow webhook is logged and
//! swallowed, never failing the enclosing profile update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::profile::ProfileRow;

const HTTP_TIMEOUT_SECS: u64 = 10;

/// The completion edge: fires only when the flag transitions false → true.
/// `true → true` (unrelated later update) and `true → false` never fire.
pub fn is_completion_transition(previous: bool, next: bool) -> bool {
    !previous && next
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification sink returned status {status}")]
    Api { status: u16 },
}

/// Payload of the completion event: subject identity, display name,
/// creation time, and routing identifiers when present.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileCompletedEvent {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl ProfileCompletedEvent {
    pub fn from_profile(profile: &ProfileRow) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            created_at: profile.created_at,
            slug: profile.slug.clone(),
            username: profile.username.clone(),
        }
    }
}

/// Fire-and-forget delivery of completion events.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn profile_completed(&self, event: &ProfileCompletedEvent) -> Result<(), NotifyError>;
}

/// Webhook-backed sink posting the event as JSON to a configured URL.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            url,
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn profile_completed(&self, event: &ProfileCompletedEvent) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(event).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Api {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
