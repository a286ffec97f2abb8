use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::ProfileRow;
use crate::profile::patch::ProfileUpdate;
use crate::profile::propagate::PropagationOutcome;
use crate::profile::service::{fetch_profile, update_profile};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub update: ProfileUpdate,
}

#[derive(Serialize)]
pub struct UpdateProfileResponse {
    pub user: ProfileRow,
    pub resume_slug_updated: bool,
    pub new_resume_slug: Option<String>,
    /// Per-target propagation outcomes; degraded targets show up here,
    /// never as request failures.
    pub propagations: Vec<PropagationOutcome>,
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ProfileRow>, AppError> {
    let profile = fetch_profile(&state.db, params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", params.user_id)))?;
    Ok(Json(profile))
}

/// PUT /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, AppError> {
    let outcome = update_profile(&state, req.user_id, &req.update).await?;
    Ok(Json(UpdateProfileResponse {
        user: outcome.profile,
        resume_slug_updated: outcome.resume_slug_updated,
        new_resume_slug: outcome.new_resume_slug,
        propagations: outcome.propagations,
    }))
}
