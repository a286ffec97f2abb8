//! Field reconciler — merges a tri-state partial update with the stored
//! record into the exact attribute set to write.
//!
//! Pure function of its inputs. Attributes the deployment's schema lacks
//! are silently dropped; `full_name` is always recomputed from the
//! resolved name parts, never taken from the payload.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::profile::ProfileRow;
use crate::profile::patch::{Patch, ProfileUpdate};

/// A resolved column/value pair destined for the primary UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub column: &'static str,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Bool(Option<bool>),
    Real(Option<f64>),
    Date(Option<NaiveDate>),
}

fn text(column: &'static str, value: Option<String>) -> ResolvedField {
    ResolvedField {
        column,
        value: FieldValue::Text(value),
    }
}

fn boolean(column: &'static str, value: Option<bool>) -> ResolvedField {
    ResolvedField {
        column,
        value: FieldValue::Bool(value),
    }
}

fn real(column: &'static str, value: Option<f64>) -> ResolvedField {
    ResolvedField {
        column,
        value: FieldValue::Real(value),
    }
}

fn date(column: &'static str, value: Option<NaiveDate>) -> ResolvedField {
    ResolvedField {
        column,
        value: FieldValue::Date(value),
    }
}

/// Produces the full attribute set to write for `existing` patched by
/// `update`, restricted to the columns in `available`.
pub fn resolve_fields(
    existing: &ProfileRow,
    update: &ProfileUpdate,
    available: &HashSet<String>,
) -> Result<Vec<ResolvedField>, AppError> {
    let first_name = update.first_name.resolve(existing.first_name.clone());
    let last_name = update.last_name.resolve(existing.last_name.clone());
    if update.full_name.is_set() {
        tracing::debug!("supplied full_name dropped; recomputed from name parts");
    }
    let full_name = recompute_full_name(&first_name, &last_name, &existing.full_name);

    // Core columns every deployment has.
    let mut fields = vec![
        text("first_name", first_name),
        text("last_name", last_name),
        text("full_name", full_name),
        text("location", update.location.resolve(existing.location.clone())),
        text(
            "avatar_url",
            update.avatar_url.resolve(existing.avatar_url.clone()),
        ),
        text("phone", update.phone.resolve(existing.phone.clone())),
        text("bio", update.bio.resolve(existing.bio.clone())),
        text("position", update.position.resolve(existing.position.clone())),
    ];

    // Deployment-dependent columns: written only when the schema has them,
    // silently dropped otherwise.
    if available.contains("completed_data") {
        fields.push(boolean(
            "completed_data",
            update
                .completed_data
                .resolve(Some(existing.completed_data)),
        ));
    }
    if available.contains("birthday") {
        fields.push(date("birthday", resolve_birthday(update, existing)?));
    }
    if available.contains("gender") {
        fields.push(text("gender", update.gender.resolve(existing.gender.clone())));
    }
    if available.contains("gender_custom") {
        fields.push(text(
            "gender_custom",
            update.gender_custom.resolve(existing.gender_custom.clone()),
        ));
    }
    if available.contains("username") {
        fields.push(text(
            "username",
            update.username.resolve(existing.username.clone()),
        ));
    }
    if available.contains("company") {
        fields.push(text(
            "company",
            update.company.resolve(existing.company.clone()),
        ));
    }
    if available.contains("admin_level") {
        fields.push(text(
            "admin_level",
            update.admin_level.resolve(existing.admin_level.clone()),
        ));
    }
    if available.contains("location_place_id") {
        fields.push(text(
            "location_place_id",
            update
                .location_place_id
                .resolve(existing.location_place_id.clone()),
        ));
    }
    if available.contains("location_lat") {
        fields.push(real(
            "location_lat",
            update.location_lat.resolve(existing.location_lat),
        ));
    }
    if available.contains("location_lng") {
        fields.push(real(
            "location_lng",
            update.location_lng.resolve(existing.location_lng),
        ));
    }
    if available.contains("location_city") {
        fields.push(text(
            "location_city",
            update.location_city.resolve(existing.location_city.clone()),
        ));
    }
    if available.contains("location_province") {
        fields.push(text(
            "location_province",
            update
                .location_province
                .resolve(existing.location_province.clone()),
        ));
    }
    if available.contains("location_country") {
        fields.push(text(
            "location_country",
            update
                .location_country
                .resolve(existing.location_country.clone()),
        ));
    }
    if available.contains("location_barangay") {
        fields.push(text(
            "location_barangay",
            update
                .location_barangay
                .resolve(existing.location_barangay.clone()),
        ));
    }
    if available.contains("location_region") {
        fields.push(text(
            "location_region",
            update
                .location_region
                .resolve(existing.location_region.clone()),
        ));
    }

    Ok(fields)
}

/// `full_name` is the trimmed concatenation of the resolved name parts.
/// When both parts are empty the stored value is kept rather than blanked.
fn recompute_full_name(
    first_name: &Option<String>,
    last_name: &Option<String>,
    existing: &Option<String>,
) -> Option<String> {
    let recomputed = format!(
        "{} {}",
        first_name.as_deref().unwrap_or(""),
        last_name.as_deref().unwrap_or("")
    );
    let recomputed = recomputed.trim();
    if recomputed.is_empty() {
        existing.clone()
    } else {
        Some(recomputed.to_string())
    }
}

/// Birthday arrives as a string. Blank means "no value" (DATE columns
/// reject empty strings); anything else must be `YYYY-MM-DD`.
fn resolve_birthday(
    update: &ProfileUpdate,
    existing: &ProfileRow,
) -> Result<Option<NaiveDate>, AppError> {
    match &update.birthday {
        Patch::Missing => Ok(existing.birthday),
        Patch::Null => Ok(None),
        Patch::Value(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| {
                    AppError::Validation(format!("birthday must be YYYY-MM-DD, got '{trimmed}'"))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_columns() -> HashSet<String> {
        [
            "completed_data",
            "birthday",
            "gender",
            "gender_custom",
            "username",
            "company",
            "admin_level",
            "location_place_id",
            "location_lat",
            "location_lng",
            "location_city",
            "location_province",
            "location_country",
            "location_barangay",
            "location_region",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn field<'a>(fields: &'a [ResolvedField], column: &str) -> &'a FieldValue {
        &fields
            .iter()
            .find(|f| f.column == column)
            .unwrap_or_else(|| panic!("column {column} not resolved"))
            .value
    }

    fn update(json: &str) -> ProfileUpdate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_omitted_attributes_keep_existing_values() {
        let existing = ProfileRow::sample();
        let fields =
            resolve_fields(&existing, &update(r#"{"bio": "New bio"}"#), &all_columns()).unwrap();

        assert_eq!(
            field(&fields, "bio"),
            &FieldValue::Text(Some("New bio".to_string()))
        );
        assert_eq!(
            field(&fields, "phone"),
            &FieldValue::Text(Some("+63 900 000 0000".to_string()))
        );
        assert_eq!(
            field(&fields, "position"),
            &FieldValue::Text(Some("Software Engineer".to_string()))
        );
    }

    #[test]
    fn test_null_clears_an_attribute() {
        let existing = ProfileRow::sample();
        let fields =
            resolve_fields(&existing, &update(r#"{"company": null}"#), &all_columns()).unwrap();

        assert_eq!(field(&fields, "company"), &FieldValue::Text(None));
    }

    #[test]
    fn test_full_name_recomputed_from_resolved_names() {
        let existing = ProfileRow::sample();
        let fields = resolve_fields(
            &existing,
            &update(r#"{"first_name": "  Maria "}"#),
            &all_columns(),
        )
        .unwrap();

        // New first name joins the kept last name, trimmed.
        assert_eq!(
            field(&fields, "full_name"),
            &FieldValue::Text(Some("Maria  Reyes".trim().to_string()))
        );
    }

    #[test]
    fn test_supplied_full_name_is_ignored() {
        let existing = ProfileRow::sample();
        let fields = resolve_fields(
            &existing,
            &update(r#"{"full_name": "Totally Forged"}"#),
            &all_columns(),
        )
        .unwrap();

        assert_eq!(
            field(&fields, "full_name"),
            &FieldValue::Text(Some("Ana Reyes".to_string()))
        );
    }

    #[test]
    fn test_empty_names_keep_existing_full_name() {
        let mut existing = ProfileRow::sample();
        existing.first_name = None;
        existing.last_name = None;
        let fields = resolve_fields(&existing, &update(r#"{}"#), &all_columns()).unwrap();

        assert_eq!(
            field(&fields, "full_name"),
            &FieldValue::Text(Some("Ana Reyes".to_string()))
        );
    }

    #[test]
    fn test_blank_birthday_normalizes_to_no_value() {
        let mut existing = ProfileRow::sample();
        existing.birthday = NaiveDate::from_ymd_opt(1990, 1, 1);
        let fields =
            resolve_fields(&existing, &update(r#"{"birthday": "  "}"#), &all_columns()).unwrap();

        assert_eq!(field(&fields, "birthday"), &FieldValue::Date(None));
    }

    #[test]
    fn test_valid_birthday_parses() {
        let existing = ProfileRow::sample();
        let fields = resolve_fields(
            &existing,
            &update(r#"{"birthday": "1990-06-15"}"#),
            &all_columns(),
        )
        .unwrap();

        assert_eq!(
            field(&fields, "birthday"),
            &FieldValue::Date(NaiveDate::from_ymd_opt(1990, 6, 15))
        );
    }

    #[test]
    fn test_invalid_birthday_is_a_validation_error() {
        let existing = ProfileRow::sample();
        let err = resolve_fields(
            &existing,
            &update(r#"{"birthday": "June 15"}"#),
            &all_columns(),
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_unavailable_optional_column_is_dropped_silently() {
        let existing = ProfileRow::sample();
        // Deployment without the structured-location migration.
        let mut available = all_columns();
        available.remove("location_city");
        available.remove("location_lat");

        let fields = resolve_fields(
            &existing,
            &update(r#"{"location_city": "Cebu", "location_lat": 10.3}"#),
            &available,
        )
        .unwrap();

        assert!(fields.iter().all(|f| f.column != "location_city"));
        assert!(fields.iter().all(|f| f.column != "location_lat"));
        // Core columns are still written.
        assert!(fields.iter().any(|f| f.column == "full_name"));
    }

    #[test]
    fn test_structured_location_resolves_as_real() {
        let existing = ProfileRow::sample();
        let fields = resolve_fields(
            &existing,
            &update(r#"{"location_lat": 14.5995}"#),
            &all_columns(),
        )
        .unwrap();

        assert_eq!(
            field(&fields, "location_lat"),
            &FieldValue::Real(Some(14.5995))
        );
    }

    #[test]
    fn test_completed_flag_passes_through() {
        let existing = ProfileRow::sample();
        let fields = resolve_fields(
            &existing,
            &update(r#"{"completed_data": true}"#),
            &all_columns(),
        )
        .unwrap();

        assert_eq!(
            field(&fields, "completed_data"),
            &FieldValue::Bool(Some(true))
        );
    }
}
