//! Profile update orchestration.
//!
//! Pipeline order: schema probe → reconcile → primary write (the commit
//! point) → best-effort fan-out → completion edge. Only steps up to and
//! including the primary write can fail the request; an absent subject is
//! detected before anything is written anywhere.

use std::time::Duration;

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{ProfileRow, PROFILE_TABLE};
use crate::notifier::{is_completion_transition, ProfileCompletedEvent};
use crate::profile::executor::apply_profile_update;
use crate::profile::patch::ProfileUpdate;
use crate::profile::propagate::{fan_out, PropagationOutcome, PropagationPlan};
use crate::profile::reconcile::resolve_fields;
use crate::state::AppState;

/// Result of a full `UpdateProfile` pass: the committed record plus the
/// visibility flags for everything that happened after the commit point.
pub struct UpdateOutcome {
    pub profile: ProfileRow,
    pub resume_slug_updated: bool,
    pub new_resume_slug: Option<String>,
    pub propagations: Vec<PropagationOutcome>,
}

pub async fn fetch_profile(
    pool: &PgPool,
    subject_id: Uuid,
) -> Result<Option<ProfileRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
        .bind(subject_id)
        .fetch_optional(pool)
        .await
}

pub async fn update_profile(
    state: &AppState,
    subject_id: Uuid,
    update: &ProfileUpdate,
) -> Result<UpdateOutcome, AppError> {
    let available = state.schema.columns(&state.db, PROFILE_TABLE).await?;

    let existing = fetch_profile(&state.db, subject_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {subject_id} not found")))?;

    let fields = resolve_fields(&existing, update, &available)?;
    let updated = apply_profile_update(&state.db, subject_id, &fields).await?;
    info!("Profile {subject_id} updated ({} fields)", fields.len());

    let plan = PropagationPlan {
        position_supplied: update.position.is_set(),
        names_changed: update.names_changed(),
    };
    let budget = Duration::from_secs(state.config.propagation_timeout_secs);
    let result = fan_out(&state.db, state.identity.as_ref(), budget, plan, &updated).await;

    // One-shot completion edge, evaluated against the pre-update flag.
    if is_completion_transition(existing.completed_data, updated.completed_data) {
        let event = ProfileCompletedEvent::from_profile(&updated);
        if let Err(err) = state.notifier.profile_completed(&event).await {
            warn!("Completed-profile notification failed for {subject_id}: {err}");
        } else {
            info!("Completed-profile notification sent for {subject_id}");
        }
    }

    let new_resume_slug = if result.slug.changed {
        result.slug.slug
    } else {
        None
    };

    Ok(UpdateOutcome {
        profile: updated,
        resume_slug_updated: result.slug.changed,
        new_resume_slug,
        propagations: result.outcomes,
    })
}
