//! Core domain logic for the veterinary clinic record store.
//! This crate is the single source of truth for referential invariants
//! between guardians, animals and appointments.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod temporal;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::animal::{Animal, AnimalId, AnimalPatch, AnimalRecord, NewAnimal};
pub use model::appointment::{
    Appointment, AppointmentCascadePatch, AppointmentId, AppointmentPatch, AppointmentRecord,
    NewAppointment,
};
pub use model::guardian::{Guardian, GuardianId, GuardianPatch, NewGuardian};
pub use model::{
    EntityKind, ValidationError, MAX_EXPLICIT_ID, MISSING_ANIMAL_LABEL, MISSING_GUARDIAN_LABEL,
};
pub use repo::{RepoError, RepoResult};
pub use service::{
    ClinicError, ClinicResult, ClinicService, DeletionReport, Entity, GuardianAnimals, Lookup,
};
pub use temporal::TemporalError;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
