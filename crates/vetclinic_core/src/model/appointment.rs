//! Appointment (scheduled visit) model and its denormalized read model.
//!
//! # Invariants
//! - `scheduled_at` is a valid minute-precision date-time; text input is only
//!   accepted in the `DD-MM-YYYY HH:mm` wire pattern.
//! - `AppointmentRecord` resolves animal and guardian names at read time and
//!   flags broken links with labels instead of failing.

use super::animal::{AnimalId, AnimalPatch};
use super::guardian::{GuardianId, GuardianPatch};
use super::{
    required, required_text, EntityKind, ValidationError, MISSING_ANIMAL_LABEL,
    MISSING_GUARDIAN_LABEL,
};
use crate::temporal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};

pub type AppointmentId = i64;

/// Stored appointment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    #[serde(with = "crate::temporal::wire")]
    pub scheduled_at: NaiveDateTime,
    pub veterinarian: String,
    pub animal_id: AnimalId,
}

/// Appointment joined with animal and guardian display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentRecord {
    pub id: AppointmentId,
    #[serde(with = "crate::temporal::wire")]
    pub scheduled_at: NaiveDateTime,
    pub veterinarian: String,
    pub animal_id: AnimalId,
    #[serde(rename = "animal", serialize_with = "serialize_animal_label")]
    pub animal_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian_id: Option<GuardianId>,
    #[serde(rename = "guardian", serialize_with = "serialize_guardian_label")]
    pub guardian_name: Option<String>,
}

impl AppointmentRecord {
    pub fn animal_label(&self) -> &str {
        self.animal_name.as_deref().unwrap_or(MISSING_ANIMAL_LABEL)
    }

    pub fn guardian_label(&self) -> &str {
        self.guardian_name.as_deref().unwrap_or(MISSING_GUARDIAN_LABEL)
    }

    pub fn to_appointment(&self) -> Appointment {
        Appointment {
            id: self.id,
            scheduled_at: self.scheduled_at,
            veterinarian: self.veterinarian.clone(),
            animal_id: self.animal_id,
        }
    }
}

fn serialize_animal_label<S: Serializer>(
    value: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(MISSING_ANIMAL_LABEL))
}

fn serialize_guardian_label<S: Serializer>(
    value: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(MISSING_GUARDIAN_LABEL))
}

/// Creation input. `scheduled_at` is raw wire text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    #[serde(default)]
    pub id: Option<AppointmentId>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub veterinarian: Option<String>,
    #[serde(default)]
    pub animal_id: Option<AnimalId>,
}

/// Validated creation fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentFields {
    pub scheduled_at: NaiveDateTime,
    pub veterinarian: String,
    pub animal_id: AnimalId,
}

impl NewAppointment {
    pub fn new(
        scheduled_at: impl Into<String>,
        veterinarian: impl Into<String>,
        animal_id: AnimalId,
    ) -> Self {
        Self {
            id: None,
            scheduled_at: Some(scheduled_at.into()),
            veterinarian: Some(veterinarian.into()),
            animal_id: Some(animal_id),
        }
    }

    /// Presence checks plus date-time normalization.
    pub fn validate(&self) -> Result<AppointmentFields, ValidationError> {
        let scheduled_text = required_text(
            EntityKind::Appointment,
            "scheduled_at",
            self.scheduled_at.as_deref(),
        )?;
        Ok(AppointmentFields {
            scheduled_at: parse_scheduled_at(&scheduled_text)?,
            veterinarian: required_text(
                EntityKind::Appointment,
                "veterinarian",
                self.veterinarian.as_deref(),
            )?,
            animal_id: required(EntityKind::Appointment, "animal_id", self.animal_id)?,
        })
    }
}

/// Partial update of the appointment row only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentPatch {
    /// Wire-pattern text; parsed on apply.
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub veterinarian: Option<String>,
    /// Relinks the appointment to another animal.
    #[serde(default)]
    pub animal_id: Option<AnimalId>,
}

impl AppointmentPatch {
    pub fn is_empty(&self) -> bool {
        self.scheduled_at.is_none() && self.veterinarian.is_none() && self.animal_id.is_none()
    }

    /// Applies present fields onto `target`.
    ///
    /// Animal existence is checked by the caller, which owns the store.
    pub fn apply(&self, target: &mut Appointment) -> Result<(), ValidationError> {
        if let Some(text) = self.scheduled_at.as_deref() {
            target.scheduled_at = parse_scheduled_at(text)?;
        }
        if let Some(veterinarian) = self.veterinarian.as_deref() {
            target.veterinarian =
                required_text(EntityKind::Appointment, "veterinarian", Some(veterinarian))?;
        }
        if let Some(animal_id) = self.animal_id {
            target.animal_id = animal_id;
        }
        Ok(())
    }
}

/// Nested update across an appointment, its animal and that animal's guardian.
///
/// Appointment fields sit at the top level; `animal` and `guardian` target
/// the records linked after the appointment fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentCascadePatch {
    #[serde(flatten)]
    pub appointment: AppointmentPatch,
    #[serde(default)]
    pub animal: Option<AnimalPatch>,
    #[serde(default)]
    pub guardian: Option<GuardianPatch>,
}

impl AppointmentCascadePatch {
    pub fn is_empty(&self) -> bool {
        self.appointment.is_empty()
            && self.animal.as_ref().map_or(true, AnimalPatch::is_empty)
            && self.guardian.as_ref().map_or(true, GuardianPatch::is_empty)
    }
}

fn parse_scheduled_at(text: &str) -> Result<NaiveDateTime, ValidationError> {
    temporal::parse(text).map_err(|source| ValidationError::InvalidFormat {
        kind: EntityKind::Appointment,
        field: "scheduled_at",
        source,
    })
}
