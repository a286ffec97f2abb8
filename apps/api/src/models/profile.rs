#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

/// Name of the primary profile table probed and written by the pipeline.
pub const PROFILE_TABLE: &str = "profiles";

/// The authoritative profile record.
///
/// Core columns are guaranteed by every deployment; the rest are
/// deployment-dependent and decode to `None` when the column itself is
/// missing, so `SELECT *` / `RETURNING *` stays safe across schemas.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub position: Option<String>,
    pub completed_data: bool,
    pub birthday: Option<NaiveDate>,
    pub slug: Option<String>,
    pub username: Option<String>,
    pub gender: Option<String>,
    pub gender_custom: Option<String>,
    pub company: Option<String>,
    pub admin_level: Option<String>,
    pub location_place_id: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub location_city: Option<String>,
    pub location_province: Option<String>,
    pub location_country: Option<String>,
    pub location_barangay: Option<String>,
    pub location_region: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reads an optional-schema column: a missing column decodes as `None`
/// instead of failing the row.
fn opt<'r, T>(row: &'r PgRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    match row.try_get::<Option<T>, _>(column) {
        Ok(value) => Ok(value),
        Err(sqlx::Error::ColumnNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl FromRow<'_, PgRow> for ProfileRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            full_name: row.try_get("full_name")?,
            location: row.try_get("location")?,
            avatar_url: row.try_get("avatar_url")?,
            phone: row.try_get("phone")?,
            bio: row.try_get("bio")?,
            position: row.try_get("position")?,
            completed_data: opt::<bool>(row, "completed_data")?.unwrap_or(false),
            birthday: opt(row, "birthday")?,
            slug: opt(row, "slug")?,
            username: opt(row, "username")?,
            gender: opt(row, "gender")?,
            gender_custom: opt(row, "gender_custom")?,
            company: opt(row, "company")?,
            admin_level: opt(row, "admin_level")?,
            location_place_id: opt(row, "location_place_id")?,
            location_lat: opt(row, "location_lat")?,
            location_lng: opt(row, "location_lng")?,
            location_city: opt(row, "location_city")?,
            location_province: opt(row, "location_province")?,
            location_country: opt(row, "location_country")?,
            location_barangay: opt(row, "location_barangay")?,
            location_region: opt(row, "location_region")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Denormalized work-status mirror, keyed by the same subject identifier.
/// `current_position` must equal `profiles.position` after propagation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WorkStatusRow {
    pub user_id: Uuid,
    pub current_position: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
impl ProfileRow {
    /// A fully-populated row for unit tests; no database involved.
    pub fn sample() -> Self {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Self {
            id: Uuid::parse_str("6b6f87aa-2b14-4f55-9c3e-5a3d51b551a1").unwrap(),
            email: "ana@example.com".to_string(),
            first_name: Some("Ana".to_string()),
            last_name: Some("Reyes".to_string()),
            full_name: Some("Ana Reyes".to_string()),
            location: Some("Manila".to_string()),
            avatar_url: None,
            phone: Some("+63 900 000 0000".to_string()),
            bio: Some("Backend engineer".to_string()),
            position: Some("Software Engineer".to_string()),
            completed_data: false,
            birthday: None,
            slug: Some("ana-reyes".to_string()),
            username: Some("anareyes".to_string()),
            gender: None,
            gender_custom: None,
            company: Some("Acme".to_string()),
            admin_level: None,
            location_place_id: None,
            location_lat: None,
            location_lng: None,
            location_city: Some("Manila".to_string()),
            location_province: None,
            location_country: Some("PH".to_string()),
            location_barangay: None,
            location_region: None,
            created_at: now,
            updated_at: now,
        }
    }
}
