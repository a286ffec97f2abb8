//! Tri-state partial-update representation.
//!
//! A JSON body distinguishes three cases per attribute: key absent (keep
//! the stored value), key present as `null` (clear it), key present with a
//! value (set it). A single `Option` cannot carry all three, so the
//! payload deserializes into `Patch<T>`.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    /// Key absent from the update mapping; the stored value is kept.
    Missing,
    /// Key present as `null`; the stored value is cleared.
    Null,
    /// Key present with a value.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Missing
    }
}

impl<T> Patch<T> {
    /// True when the attribute was supplied at all (as null or a value).
    pub fn is_set(&self) -> bool {
        !matches!(self, Patch::Missing)
    }

    /// Resolves against the stored value: `Missing` keeps it, `Null`
    /// clears it, `Value` replaces it.
    pub fn resolve(&self, existing: Option<T>) -> Option<T>
    where
        T: Clone,
    {
        match self {
            Patch::Missing => existing,
            Patch::Null => None,
            Patch::Value(value) => Some(value.clone()),
        }
    }

}

// An absent key never reaches Deserialize (serde applies the field
// default), so deserialization only distinguishes null from a value.
impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        })
    }
}

/// The validated partial update accepted by `UpdateProfile`. Every field is
/// tri-state; attributes the deployment's schema lacks are dropped later by
/// the reconciler, not rejected here.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub first_name: Patch<String>,
    pub last_name: Patch<String>,
    /// Accepted for wire compatibility but never applied; `full_name` is
    /// always recomputed from the resolved name parts.
    pub full_name: Patch<String>,
    pub location: Patch<String>,
    pub avatar_url: Patch<String>,
    pub phone: Patch<String>,
    pub bio: Patch<String>,
    pub position: Patch<String>,
    pub completed_data: Patch<bool>,
    /// Arrives as a string; blank normalizes to "no value" and anything
    /// else must parse as `YYYY-MM-DD`.
    pub birthday: Patch<String>,
    pub gender: Patch<String>,
    pub gender_custom: Patch<String>,
    pub username: Patch<String>,
    pub company: Patch<String>,
    pub admin_level: Patch<String>,
    pub location_place_id: Patch<String>,
    pub location_lat: Patch<f64>,
    pub location_lng: Patch<f64>,
    pub location_city: Patch<String>,
    pub location_province: Patch<String>,
    pub location_country: Patch<String>,
    pub location_barangay: Patch<String>,
    pub location_region: Patch<String>,
}

impl ProfileUpdate {
    /// True when a name-bearing attribute was supplied, which obligates a
    /// slug regeneration check downstream.
    pub fn names_changed(&self) -> bool {
        self.first_name.is_set() || self.last_name.is_set()
    }
}
