//! Animal (pet) model and its denormalized read model.
//!
//! # Invariants
//! - `guardian_id` points at an existing guardian when written.
//! - `AnimalRecord` carries the guardian name resolved at read time; a broken
//!   link is reported as `MISSING_GUARDIAN_LABEL`, never as an error.

use super::guardian::GuardianId;
use super::{required, required_text, EntityKind, ValidationError, MISSING_GUARDIAN_LABEL};
use serde::{Deserialize, Serialize, Serializer};

pub type AnimalId = i64;

/// Stored animal row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub name: String,
    pub species: String,
    pub guardian_id: GuardianId,
}

/// Animal joined with its guardian's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimalRecord {
    pub id: AnimalId,
    pub name: String,
    pub species: String,
    pub guardian_id: GuardianId,
    /// `None` when the guardian row no longer exists.
    #[serde(rename = "guardian", serialize_with = "serialize_guardian_label")]
    pub guardian_name: Option<String>,
}

impl AnimalRecord {
    /// Guardian display name, or the missing-guardian label.
    pub fn guardian_label(&self) -> &str {
        self.guardian_name.as_deref().unwrap_or(MISSING_GUARDIAN_LABEL)
    }

    /// Drops the denormalized guardian name.
    pub fn to_animal(&self) -> Animal {
        Animal {
            id: self.id,
            name: self.name.clone(),
            species: self.species.clone(),
            guardian_id: self.guardian_id,
        }
    }
}

fn serialize_guardian_label<S: Serializer>(
    value: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(MISSING_GUARDIAN_LABEL))
}

/// Creation input. `id = None` lets the store assign one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnimal {
    #[serde(default)]
    pub id: Option<AnimalId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub guardian_id: Option<GuardianId>,
}

/// Validated creation fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimalFields {
    pub name: String,
    pub species: String,
    pub guardian_id: GuardianId,
}

impl NewAnimal {
    pub fn new(name: impl Into<String>, species: impl Into<String>, guardian_id: GuardianId) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            species: Some(species.into()),
            guardian_id: Some(guardian_id),
        }
    }

    /// Presence checks for every required field, in declaration order.
    pub fn validate(&self) -> Result<AnimalFields, ValidationError> {
        Ok(AnimalFields {
            name: required_text(EntityKind::Animal, "name", self.name.as_deref())?,
            species: required_text(EntityKind::Animal, "species", self.species.as_deref())?,
            guardian_id: required(EntityKind::Animal, "guardian_id", self.guardian_id)?,
        })
    }
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    /// Relinks the animal to another guardian.
    #[serde(default)]
    pub guardian_id: Option<GuardianId>,
}

impl AnimalPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.species.is_none() && self.guardian_id.is_none()
    }

    /// Applies present fields onto `target`.
    ///
    /// Guardian existence is checked by the caller, which owns the store.
    pub fn apply(&self, target: &mut Animal) -> Result<(), ValidationError> {
        if let Some(name) = self.name.as_deref() {
            target.name = required_text(EntityKind::Animal, "name", Some(name))?;
        }
        if let Some(species) = self.species.as_deref() {
            target.species = required_text(EntityKind::Animal, "species", Some(species))?;
        }
        if let Some(guardian_id) = self.guardian_id {
            target.guardian_id = guardian_id;
        }
        Ok(())
    }
}
