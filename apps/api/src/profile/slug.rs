//! Slug allocator — derives the public resume identifier from name
//! attributes plus a subject-id suffix and resolves collisions against the
//! live record set.
//!
//! The check-then-write sequence is not serialized across processes;
//! concurrent updates computing the same base can theoretically both pass
//! the check (rare, self-healing on a later update cycle). Each candidate
//! is rechecked against the live set before acceptance.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::models::resume::SavedResumeRow;

const NAME_PART_MAX: usize = 20;
const FIRST_NAME_FALLBACK: &str = "user";
const LAST_NAME_FALLBACK: &str = "profile";

/// Lowercases, strips diacritics, keeps `[a-z0-9]`, and bounds the length.
/// Empty input (or input with no usable characters) yields the fallback so
/// slug generation never fails on missing names.
fn normalize_name_part(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_alphanumeric())
        .take(NAME_PART_MAX)
        .collect();

    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

/// Deterministic base slug: `{first}-{last}-{last two chars of the subject
/// identifier, left-padded to 2}`.
pub fn base_slug(first_name: Option<&str>, last_name: Option<&str>, subject_id: Uuid) -> String {
    let first = normalize_name_part(first_name.unwrap_or(""), FIRST_NAME_FALLBACK);
    let last = normalize_name_part(last_name.unwrap_or(""), LAST_NAME_FALLBACK);

    let id = subject_id.to_string();
    let tail: String = id.chars().rev().take(2).collect::<Vec<_>>().into_iter().rev().collect();
    let suffix = format!("{tail:0>2}");

    format!("{first}-{last}-{suffix}")
}

/// Collision lookup against the live slug set. The subject's own record is
/// excluded so regeneration with unchanged inputs is idempotent.
#[async_trait]
pub trait SlugIndex: Send + Sync {
    async fn is_taken(&self, candidate: &str, exclude_resume: Uuid) -> Result<bool>;
}

#[async_trait]
impl SlugIndex for PgPool {
    async fn is_taken(&self, candidate: &str, exclude_resume: Uuid) -> Result<bool> {
        let hit: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM saved_resumes WHERE resume_slug = $1 AND id <> $2 LIMIT 1",
        )
        .bind(candidate)
        .bind(exclude_resume)
        .fetch_optional(self)
        .await?;
        Ok(hit.is_some())
    }
}

/// Finds the first unused candidate: the base itself, then `base-1`,
/// `base-2`, … Every candidate is rechecked against the live set.
pub async fn allocate_slug(index: &dyn SlugIndex, resume_id: Uuid, base: &str) -> Result<String> {
    let mut candidate = base.to_string();
    let mut counter = 1;

    while index.is_taken(&candidate, resume_id).await? {
        candidate = format!("{base}-{counter}");
        counter += 1;
    }
    Ok(candidate)
}

/// Result of a slug sync pass. `changed` is only set on a confirmed write
/// to the resume record.
#[derive(Debug, Clone, Default)]
pub struct SlugSync {
    pub changed: bool,
    pub slug: Option<String>,
}

/// Brings the live resume record's slug in line with the committed names.
/// Runs as a propagation target: a no-op when the subject has no saved
/// resume, or when names did not change and a slug already exists.
pub async fn sync_resume_slug(
    pool: &PgPool,
    subject_id: Uuid,
    first_name: Option<&str>,
    last_name: Option<&str>,
    names_changed: bool,
) -> Result<SlugSync> {
    let resume: Option<SavedResumeRow> = sqlx::query_as(
        "SELECT * FROM saved_resumes WHERE user_id = $1 ORDER BY updated_at DESC LIMIT 1",
    )
    .bind(subject_id)
    .fetch_optional(pool)
    .await?;

    let Some(resume) = resume else {
        return Ok(SlugSync::default());
    };
    if !names_changed && resume.resume_slug.is_some() {
        return Ok(SlugSync {
            changed: false,
            slug: resume.resume_slug,
        });
    }

    let base = base_slug(first_name, last_name, subject_id);
    let allocated = allocate_slug(pool, resume.id, &base).await?;

    // Idempotent regeneration: identical outcome means no write.
    if resume.resume_slug.as_deref() == Some(allocated.as_str()) {
        return Ok(SlugSync {
            changed: false,
            slug: Some(allocated),
        });
    }

    sqlx::query("UPDATE saved_resumes SET resume_slug = $1, updated_at = NOW() WHERE id = $2")
        .bind(&allocated)
        .bind(resume.id)
        .execute(pool)
        .await?;
    info!("Resume slug for {subject_id} updated to '{allocated}'");

    // Cross-reference rows carry a copy of the slug. Their failure does not
    // undo the resume write.
    if let Err(err) = sqlx::query("UPDATE applications SET resume_slug = $1 WHERE resume_id = $2")
        .bind(&allocated)
        .bind(resume.id)
        .execute(pool)
        .await
    {
        warn!(
            "applications cross-reference slug update failed for resume {}: {err}",
            resume.id
        );
    }

    Ok(SlugSync {
        changed: true,
        slug: Some(allocated),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn subject(ending: &str) -> Uuid {
        let id = format!("11111111-1111-1111-1111-1111111111{ending}");
        Uuid::parse_str(&id).unwrap()
    }

    /// In-memory slug index: slug → owning resume id.
    struct FakeIndex {
        taken: HashMap<String, Uuid>,
    }

    #[async_trait]
    impl SlugIndex for FakeIndex {
        async fn is_taken(&self, candidate: &str, exclude_resume: Uuid) -> Result<bool> {
            Ok(self
                .taken
                .get(candidate)
                .is_some_and(|owner| *owner != exclude_resume))
        }
    }

    #[test]
    fn test_base_slug_strips_diacritics_and_spaces() {
        let slug = base_slug(Some("José"), Some("Dela Cruz"), subject("a1"));
        assert_eq!(slug, "jose-delacruz-a1");
    }

    #[test]
    fn test_base_slug_is_deterministic() {
        let id = subject("7f");
        assert_eq!(
            base_slug(Some("Ana"), Some("Reyes"), id),
            base_slug(Some("Ana"), Some("Reyes"), id)
        );
    }

    #[test]
    fn test_missing_names_fall_back_to_literals() {
        let slug = base_slug(None, None, subject("0c"));
        assert_eq!(slug, "user-profile-0c");
    }

    #[test]
    fn test_symbol_only_name_falls_back() {
        let slug = base_slug(Some("!!!"), Some("Reyes"), subject("42"));
        assert_eq!(slug, "user-reyes-42");
    }

    #[test]
    fn test_name_parts_are_bounded() {
        let long = "abcdefghijklmnopqrstuvwxyz";
        let slug = base_slug(Some(long), Some("x"), subject("00"));
        assert_eq!(slug, "abcdefghijklmnopqrst-x-00");
    }

    #[tokio::test]
    async fn test_unused_base_is_accepted_as_is() {
        let index = FakeIndex {
            taken: HashMap::new(),
        };
        let slug = allocate_slug(&index, Uuid::new_v4(), "jose-delacruz-a1")
            .await
            .unwrap();
        assert_eq!(slug, "jose-delacruz-a1");
    }

    #[tokio::test]
    async fn test_collision_appends_counter() {
        let index = FakeIndex {
            taken: HashMap::from([("jose-delacruz-a1".to_string(), Uuid::new_v4())]),
        };
        let slug = allocate_slug(&index, Uuid::new_v4(), "jose-delacruz-a1")
            .await
            .unwrap();
        assert_eq!(slug, "jose-delacruz-a1-1");
    }

    #[tokio::test]
    async fn test_counter_increments_until_free() {
        let other = Uuid::new_v4();
        let index = FakeIndex {
            taken: HashMap::from([
                ("ana-reyes-7f".to_string(), other),
                ("ana-reyes-7f-1".to_string(), other),
                ("ana-reyes-7f-2".to_string(), other),
            ]),
        };
        let slug = allocate_slug(&index, Uuid::new_v4(), "ana-reyes-7f")
            .await
            .unwrap();
        assert_eq!(slug, "ana-reyes-7f-3");
    }

    #[tokio::test]
    async fn test_own_record_is_excluded_from_collision_check() {
        let own = Uuid::new_v4();
        let index = FakeIndex {
            taken: HashMap::from([("ana-reyes-7f".to_string(), own)]),
        };
        // Regenerating for the record that already holds the base slug must
        // yield the same value, not a suffixed one.
        let slug = allocate_slug(&index, own, "ana-reyes-7f").await.unwrap();
        assert_eq!(slug, "ana-reyes-7f");
    }

    #[tokio::test]
    async fn test_suffixed_allocation_is_stable_for_its_owner() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let index = FakeIndex {
            taken: HashMap::from([
                ("ana-reyes-7f".to_string(), other),
                ("ana-reyes-7f-1".to_string(), own),
            ]),
        };
        let slug = allocate_slug(&index, own, "ana-reyes-7f").await.unwrap();
        assert_eq!(slug, "ana-reyes-7f-1");
    }
}
