//! Clinic domain model.
//!
//! # Responsibility
//! - Define the guardian/animal/appointment records used by core logic.
//! - Define creation drafts and partial-update patches with explicit
//!   apply-if-present semantics.
//!
//! # Invariants
//! - Every record is identified by a per-kind integer id.
//! - Animals point at exactly one guardian; appointments at exactly one animal.
//! - Required text fields are never blank once stored.

pub mod animal;
pub mod appointment;
pub mod guardian;

use crate::temporal::TemporalError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Label used when an animal's guardian link cannot be resolved.
pub const MISSING_GUARDIAN_LABEL: &str = "Sem tutor";
/// Label used when an appointment's animal link cannot be resolved.
pub const MISSING_ANIMAL_LABEL: &str = "Sem animal";

/// Entity kinds managed by the clinic store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Guardian,
    Animal,
    Appointment,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guardian => "guardian",
            Self::Animal => "animal",
            Self::Appointment => "appointment",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input validation failure raised before any record is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field absent or blank.
    MissingField {
        kind: EntityKind,
        field: &'static str,
    },
    /// Date-time text does not match the wire pattern.
    InvalidFormat {
        kind: EntityKind,
        field: &'static str,
        source: TemporalError,
    },
    /// Caller-supplied id outside `1..=MAX_EXPLICIT_ID`.
    IdOutOfRange { kind: EntityKind, id: i64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { kind, field } => {
                write!(f, "{kind}.{field} is required and must not be blank")
            }
            Self::InvalidFormat {
                kind,
                field,
                source,
            } => write!(f, "{kind}.{field}: {source}"),
            Self::IdOutOfRange { kind, id } => {
                write!(f, "{kind}.id {id} is outside 1..={MAX_EXPLICIT_ID}")
            }
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MissingField { .. } | Self::IdOutOfRange { .. } => None,
            Self::InvalidFormat { source, .. } => Some(source),
        }
    }
}

/// Returns trimmed text, or `MissingField` when absent or blank.
pub(crate) fn required_text(
    kind: EntityKind,
    field: &'static str,
    value: Option<&str>,
) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ValidationError::MissingField { kind, field }),
    }
}

/// Largest id a caller may pick; `i64::MAX` is left for the next generated id.
pub const MAX_EXPLICIT_ID: i64 = i64::MAX - 1;

/// Accepts an absent id, or a caller-supplied one in `1..=MAX_EXPLICIT_ID`.
pub(crate) fn explicit_id(kind: EntityKind, id: Option<i64>) -> Result<(), ValidationError> {
    match id {
        Some(id) if !(1..=MAX_EXPLICIT_ID).contains(&id) => {
            Err(ValidationError::IdOutOfRange { kind, id })
        }
        _ => Ok(()),
    }
}

/// Returns the value, or `MissingField` when absent.
pub(crate) fn required<T: Copy>(
    kind: EntityKind,
    field: &'static str,
    value: Option<T>,
) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField { kind, field })
}

/// Case-insensitive substring match used by name/species/veterinarian filters.
///
/// An empty fragment matches everything.
pub fn contains_ignore_case(haystack: &str, fragment: &str) -> bool {
    let needle = fragment.trim().to_lowercase();
    needle.is_empty() || haystack.to_lowercase().contains(needle.as_str())
}

#[cfg(test)]
mod tests {
    use super::{
        contains_ignore_case, explicit_id, required, required_text, EntityKind, ValidationError,
        MAX_EXPLICIT_ID,
    };

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(
            required_text(EntityKind::Guardian, "name", Some("  Maria ")).expect("text present"),
            "Maria"
        );
        let error = required_text(EntityKind::Guardian, "name", Some("   "))
            .expect_err("blank text must be rejected");
        assert_eq!(
            error,
            ValidationError::MissingField {
                kind: EntityKind::Guardian,
                field: "name",
            }
        );
        assert!(required_text(EntityKind::Animal, "species", None).is_err());
    }

    #[test]
    fn required_reports_field_name() {
        let error = required::<i64>(EntityKind::Animal, "guardian_id", None)
            .expect_err("absent id must be rejected");
        assert_eq!(error.to_string(), "animal.guardian_id is required and must not be blank");
    }

    #[test]
    fn explicit_id_accepts_positive_ids_below_the_reserved_maximum() {
        assert!(explicit_id(EntityKind::Guardian, None).is_ok());
        assert!(explicit_id(EntityKind::Guardian, Some(1)).is_ok());
        assert!(explicit_id(EntityKind::Guardian, Some(MAX_EXPLICIT_ID)).is_ok());

        for id in [0, -5, i64::MIN, i64::MAX] {
            assert_eq!(
                explicit_id(EntityKind::Animal, Some(id)),
                Err(ValidationError::IdOutOfRange {
                    kind: EntityKind::Animal,
                    id,
                })
            );
        }
    }

    #[test]
    fn contains_ignore_case_handles_accents() {
        assert!(contains_ignore_case("Dr. João", "JOÃO"));
        assert!(contains_ignore_case("Cachorro", "ach"));
        assert!(contains_ignore_case("anything", "  "));
        assert!(!contains_ignore_case("Gato", "cach"));
    }
}
