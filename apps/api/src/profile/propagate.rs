//! Propagation fan-out — applies the committed profile change to the
//! dependent stores. Every target is isolated: one failure is logged,
//! reported as a degraded outcome, and never blocks the others or the
//! already-committed primary update.

use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use tokio::time::error::Elapsed;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::identity::{IdentitySync, ProfileMetadata};
use crate::models::profile::ProfileRow;
use crate::profile::slug::{sync_resume_slug, SlugSync};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationStatus {
    Applied,
    Skipped,
    Failed,
}

/// Structured outcome for one propagation target, collected and returned
/// uniformly instead of ad hoc inline logging.
#[derive(Debug, Clone, Serialize)]
pub struct PropagationOutcome {
    pub target: &'static str,
    pub status: PropagationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn applied(target: &'static str) -> PropagationOutcome {
    PropagationOutcome {
        target,
        status: PropagationStatus::Applied,
        detail: None,
    }
}

fn skipped(target: &'static str, detail: &str) -> PropagationOutcome {
    PropagationOutcome {
        target,
        status: PropagationStatus::Skipped,
        detail: Some(detail.to_string()),
    }
}

fn failed(target: &'static str, detail: String) -> PropagationOutcome {
    PropagationOutcome {
        target,
        status: PropagationStatus::Failed,
        detail: Some(detail),
    }
}

/// What the fan-out was asked to do, derived from which attributes the
/// update actually supplied.
#[derive(Debug, Clone, Copy)]
pub struct PropagationPlan {
    pub position_supplied: bool,
    pub names_changed: bool,
}

pub struct FanOutResult {
    pub outcomes: Vec<PropagationOutcome>,
    pub slug: SlugSync,
}

/// Upserts the denormalized work-status mirror; the record is created
/// lazily on first propagation.
pub async fn upsert_work_status(
    pool: &PgPool,
    subject_id: Uuid,
    position: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO user_work_status (user_id, current_position, created_at, updated_at) \
         VALUES ($1, $2, NOW(), NOW()) \
         ON CONFLICT (user_id) \
         DO UPDATE SET current_position = EXCLUDED.current_position, updated_at = NOW()",
    )
    .bind(subject_id)
    .bind(position)
    .execute(pool)
    .await?;
    Ok(())
}

/// Pushes the committed record's public attributes to the identity
/// provider, bounded by the propagation budget.
pub async fn sync_identity(
    identity: &dyn IdentitySync,
    budget: Duration,
    updated: &ProfileRow,
) -> PropagationOutcome {
    let metadata = ProfileMetadata::from_profile(updated);
    match timeout(budget, identity.update_user_metadata(updated.id, &metadata)).await {
        Ok(Ok(())) => applied("identity_metadata"),
        Ok(Err(err)) => {
            warn!("Identity metadata sync failed for {}: {err}", updated.id);
            failed("identity_metadata", err.to_string())
        }
        Err(_) => {
            warn!("Identity metadata sync timed out for {}", updated.id);
            failed("identity_metadata", "timed out".to_string())
        }
    }
}

fn settle(
    target: &'static str,
    attempt: Result<anyhow::Result<()>, Elapsed>,
) -> PropagationOutcome {
    match attempt {
        Ok(Ok(())) => applied(target),
        Ok(Err(err)) => {
            warn!("Propagation to {target} failed: {err:#}");
            failed(target, format!("{err:#}"))
        }
        Err(_) => {
            warn!("Propagation to {target} timed out");
            failed(target, "timed out".to_string())
        }
    }
}

/// Sequential best-effort execution of all propagation targets. Always
/// returns; degraded targets surface only in the outcomes.
pub async fn fan_out(
    pool: &PgPool,
    identity: &dyn IdentitySync,
    budget: Duration,
    plan: PropagationPlan,
    updated: &ProfileRow,
) -> FanOutResult {
    let mut outcomes = Vec::with_capacity(3);
    let mut slug = SlugSync::default();

    // Work-status mirror, only when the update supplied a position
    // (supplied-as-null still mirrors the cleared value).
    if plan.position_supplied {
        let attempt = timeout(
            budget,
            upsert_work_status(pool, updated.id, updated.position.as_deref()),
        )
        .await;
        outcomes.push(settle("work_status", attempt));
    } else {
        outcomes.push(skipped("work_status", "position not supplied"));
    }

    // Resume slug and its cross-references.
    match timeout(
        budget,
        sync_resume_slug(
            pool,
            updated.id,
            updated.first_name.as_deref(),
            updated.last_name.as_deref(),
            plan.names_changed,
        ),
    )
    .await
    {
        Ok(Ok(sync)) => {
            if sync.changed {
                outcomes.push(applied("resume_slug"));
            } else {
                outcomes.push(skipped("resume_slug", "no slug change required"));
            }
            slug = sync;
        }
        Ok(Err(err)) => {
            warn!("Resume slug sync failed for {}: {err:#}", updated.id);
            outcomes.push(failed("resume_slug", format!("{err:#}")));
        }
        Err(_) => {
            warn!("Resume slug sync timed out for {}", updated.id);
            outcomes.push(failed("resume_slug", "timed out".to_string()));
        }
    }

    // Identity provider's metadata copy.
    outcomes.push(sync_identity(identity, budget, updated).await);

    FanOutResult { outcomes, slug }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::identity::IdentityError;

    struct FailingSync;

    #[async_trait]
    impl IdentitySync for FailingSync {
        async fn update_user_metadata(
            &self,
            _subject_id: Uuid,
            _metadata: &ProfileMetadata,
        ) -> Result<(), IdentityError> {
            Err(IdentityError::Api {
                status: 500,
                message: "injected failure".to_string(),
            })
        }
    }

    struct StallingSync;

    #[async_trait]
    impl IdentitySync for StallingSync {
        async fn update_user_metadata(
            &self,
            _subject_id: Uuid,
            _metadata: &ProfileMetadata,
        ) -> Result<(), IdentityError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    struct RecordingSync;

    #[async_trait]
    impl IdentitySync for RecordingSync {
        async fn update_user_metadata(
            &self,
            _subject_id: Uuid,
            metadata: &ProfileMetadata,
        ) -> Result<(), IdentityError> {
            assert_eq!(metadata.full_name.as_deref(), Some("Ana Reyes"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_identity_failure_is_a_degraded_outcome() {
        let profile = ProfileRow::sample();
        let outcome = sync_identity(&FailingSync, Duration::from_secs(5), &profile).await;

        assert_eq!(outcome.status, PropagationStatus::Failed);
        assert!(outcome.detail.unwrap().contains("injected failure"));
    }

    #[tokio::test]
    async fn test_identity_success_is_applied() {
        let profile = ProfileRow::sample();
        let outcome = sync_identity(&RecordingSync, Duration::from_secs(5), &profile).await;

        assert_eq!(outcome.status, PropagationStatus::Applied);
        assert!(outcome.detail.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_target_is_bounded_by_the_budget() {
        let profile = ProfileRow::sample();
        let outcome = sync_identity(&StallingSync, Duration::from_secs(2), &profile).await;

        assert_eq!(outcome.status, PropagationStatus::Failed);
        assert_eq!(outcome.detail.as_deref(), Some("timed out"));
    }

    #[test]
    fn test_outcome_serializes_without_empty_detail() {
        let value = serde_json::to_value(applied("work_status")).unwrap();
        assert_eq!(value.get("status").unwrap(), "applied");
        assert!(value.get("detail").is_none());

        let value = serde_json::to_value(failed("work_status", "boom".to_string())).unwrap();
        assert_eq!(value.get("status").unwrap(), "failed");
        assert_eq!(value.get("detail").unwrap(), "boom");
    }
}
