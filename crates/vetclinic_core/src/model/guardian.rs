//! Guardian (animal owner) model.

use super::{required_text, EntityKind, ValidationError};
use serde::{Deserialize, Serialize};

pub type GuardianId = i64;

/// Owner responsible for one or more animals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    pub id: GuardianId,
    pub name: String,
}

/// Creation input. `id = None` lets the store assign one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGuardian {
    #[serde(default)]
    pub id: Option<GuardianId>,
    #[serde(default)]
    pub name: Option<String>,
}

impl NewGuardian {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Returns the normalized name, or `MissingField`.
    pub fn require_name(&self) -> Result<String, ValidationError> {
        required_text(EntityKind::Guardian, "name", self.name.as_deref())
    }
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianPatch {
    #[serde(default)]
    pub name: Option<String>,
}

impl GuardianPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }

    /// Applies present fields onto `target`.
    ///
    /// A present-but-blank name is rejected rather than stored.
    pub fn apply(&self, target: &mut Guardian) -> Result<(), ValidationError> {
        if let Some(name) = self.name.as_deref() {
            target.name = required_text(EntityKind::Guardian, "name", Some(name))?;
        }
        Ok(())
    }
}
