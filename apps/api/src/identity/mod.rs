//! Identity provider client — mirrors the committed profile's public
//! attributes into the provider's per-user metadata copy.
//!
//! The provider's copy is derived, never authoritative: a failed sync is a
//! degraded outcome, not a request failure. `AppState` holds the client as
//! `Arc<dyn IdentitySync>` so tests can inject a failing or slow sync.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::profile::ProfileRow;

const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider returned status {status}: {message}")]
    Api { status: u16, message: String },
}

/// The attribute mapping pushed to the identity provider. Field set matches
/// what the provider displays: names, contact, location, position, bio,
/// employer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileMetadata {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
}

impl ProfileMetadata {
    pub fn from_profile(profile: &ProfileRow) -> Self {
        Self {
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            full_name: profile.full_name.clone(),
            location: profile.location.clone(),
            phone: profile.phone.clone(),
            position: profile.position.clone(),
            bio: profile.bio.clone(),
            company: profile.company.clone(),
        }
    }
}

#[derive(Serialize)]
struct MetadataEnvelope<'a> {
    user_metadata: &'a ProfileMetadata,
}

/// Pushes profile attributes to the identity provider's metadata store.
#[async_trait]
pub trait IdentitySync: Send + Sync {
    async fn update_user_metadata(
        &self,
        subject_id: Uuid,
        metadata: &ProfileMetadata,
    ) -> Result<(), IdentityError>;
}

/// HTTP client for the identity provider's admin API, authenticated with
/// the service-role key. Initialized once in `main` and reused.
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl IdentityClient {
    pub fn new(base_url: String, service_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }
}

#[async_trait]
impl IdentitySync for IdentityClient {
    async fn update_user_metadata(
        &self,
        subject_id: Uuid,
        metadata: &ProfileMetadata,
    ) -> Result<(), IdentityError> {
        let url = format!("{}/auth/v1/admin/users/{}", self.base_url, subject_id);

        let response = self
            .client
            .put(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&MetadataEnvelope {
                user_metadata: metadata,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Identity metadata updated for {subject_id}");
        Ok(())
    }
}
