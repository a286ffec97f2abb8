#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A saved public resume. The most recently updated row per subject is the
/// live record whose `resume_slug` mirrors the owner's name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SavedResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resume_slug: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
