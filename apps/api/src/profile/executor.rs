//! Primary update executor — the single authoritative write of the
//! pipeline. Its success is the commit point; everything after it is
//! best-effort and must not roll it back.

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{ProfileRow, PROFILE_TABLE};
use crate::profile::reconcile::{FieldValue, ResolvedField};

/// Builds the dynamic UPDATE over exactly the resolved columns. Column
/// names come from the reconciler's static catalog, never from input.
pub fn build_update(
    subject_id: Uuid,
    fields: &[ResolvedField],
) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("UPDATE {PROFILE_TABLE} SET "));

    let mut assignments = builder.separated(", ");
    for field in fields {
        assignments.push(field.column);
        assignments.push_unseparated(" = ");
        match &field.value {
            FieldValue::Text(value) => assignments.push_bind_unseparated(value.clone()),
            FieldValue::Bool(value) => assignments.push_bind_unseparated(*value),
            FieldValue::Real(value) => assignments.push_bind_unseparated(*value),
            FieldValue::Date(value) => assignments.push_bind_unseparated(*value),
        };
    }
    assignments.push_unseparated(", updated_at = NOW()");

    builder.push(" WHERE id = ");
    builder.push_bind(subject_id);
    builder.push(" RETURNING *");
    builder
}

/// Writes the resolved attribute set and returns the full updated record.
/// "No row updated" means the subject has no profile and is fatal;
/// constraint violations surface as `WriteRejected`.
pub async fn apply_profile_update(
    pool: &PgPool,
    subject_id: Uuid,
    fields: &[ResolvedField],
) -> Result<ProfileRow, AppError> {
    let mut builder = build_update(subject_id, fields);

    let updated = builder
        .build_query_as::<ProfileRow>()
        .fetch_optional(pool)
        .await
        .map_err(map_write_error)?;

    updated.ok_or_else(|| AppError::NotFound(format!("Profile {subject_id} not found")))
}

fn map_write_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.constraint().is_some() => {
            AppError::WriteRejected(db.message().to_string())
        }
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_field(column: &'static str, value: &str) -> ResolvedField {
        ResolvedField {
            column,
            value: FieldValue::Text(Some(value.to_string())),
        }
    }

    #[test]
    fn test_update_covers_exactly_the_resolved_columns() {
        let subject = Uuid::new_v4();
        let fields = vec![
            text_field("first_name", "Ana"),
            text_field("full_name", "Ana Reyes"),
            ResolvedField {
                column: "completed_data",
                value: FieldValue::Bool(Some(true)),
            },
        ];

        let builder = build_update(subject, &fields);
        assert_eq!(
            builder.sql(),
            "UPDATE profiles SET first_name = $1, full_name = $2, \
             completed_data = $3, updated_at = NOW() WHERE id = $4 RETURNING *"
        );
    }

    #[test]
    fn test_update_always_touches_updated_at() {
        let builder = build_update(Uuid::new_v4(), &[text_field("bio", "x")]);
        assert!(builder.sql().contains("updated_at = NOW()"));
    }
}
