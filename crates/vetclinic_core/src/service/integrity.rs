//! Relationship integrity use-cases.
//!
//! # Responsibility
//! - Create records only when their parent exists and their id is free.
//! - Apply partial and nested (appointment -> animal -> guardian) updates.
//! - Delete records together with every dependent via an explicit traversal.
//!
//! # Invariants
//! - No animal or appointment survives its parent's deletion.
//! - Cascades delete leaves first: appointments, then animals, then guardians.
//! - Relink updates point only at existing parents.

use super::{ClinicError, ClinicResult, ClinicService};
use crate::model::animal::{Animal, AnimalId, AnimalPatch, AnimalRecord, NewAnimal};
use crate::model::appointment::{
    Appointment, AppointmentCascadePatch, AppointmentId, AppointmentPatch, AppointmentRecord,
    NewAppointment,
};
use crate::model::guardian::{Guardian, GuardianId, GuardianPatch, NewGuardian};
use crate::model::{explicit_id, EntityKind};
use crate::repo::animal_repo::{AnimalRepository, SqliteAnimalRepository};
use crate::repo::appointment_repo::{AppointmentRepository, SqliteAppointmentRepository};
use crate::repo::guardian_repo::{GuardianRepository, SqliteGuardianRepository};
use log::info;
use rusqlite::Connection;
use serde::Serialize;

/// Ids removed by one delete operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub guardians: Vec<GuardianId>,
    pub animals: Vec<AnimalId>,
    pub appointments: Vec<AppointmentId>,
}

impl DeletionReport {
    pub fn total(&self) -> usize {
        self.guardians.len() + self.animals.len() + self.appointments.len()
    }
}

impl ClinicService<'_> {
    /// Creates a guardian.
    ///
    /// # Errors
    /// - `MissingField` when `name` is absent or blank.
    /// - `DuplicateId` when `draft.id` is already used.
    /// - `InvalidId` when `draft.id` is not in `1..=MAX_EXPLICIT_ID`.
    pub fn create_guardian(&mut self, draft: &NewGuardian) -> ClinicResult<Guardian> {
        let guardian = self.write("guardian_create", |tx| {
            let name = draft.require_name()?;
            explicit_id(EntityKind::Guardian, draft.id)?;
            let guardians = SqliteGuardianRepository::new(tx);
            if let Some(id) = draft.id {
                if guardians.guardian_exists(id)? {
                    return Err(ClinicError::DuplicateId(EntityKind::Guardian, id));
                }
            }
            Ok(guardians.insert_guardian(draft.id, &name)?)
        })?;

        info!(
            "event=guardian_create module=service status=ok guardian_id={}",
            guardian.id
        );
        Ok(guardian)
    }

    /// Creates an animal under an existing guardian.
    ///
    /// # Errors
    /// - `MissingField` for absent `name`, `species` or `guardian_id`.
    /// - `DuplicateId` when `draft.id` is already used.
    /// - `InvalidId` when `draft.id` is not in `1..=MAX_EXPLICIT_ID`.
    /// - `NotFound` when the guardian does not exist.
    pub fn create_animal(&mut self, draft: &NewAnimal) -> ClinicResult<Animal> {
        let animal = self.write("animal_create", |tx| {
            let fields = draft.validate()?;
            explicit_id(EntityKind::Animal, draft.id)?;
            let animals = SqliteAnimalRepository::new(tx);
            if let Some(id) = draft.id {
                if animals.animal_exists(id)? {
                    return Err(ClinicError::DuplicateId(EntityKind::Animal, id));
                }
            }
            ensure_guardian_exists(tx, fields.guardian_id)?;
            Ok(animals.insert_animal(draft.id, &fields)?)
        })?;

        info!(
            "event=animal_create module=service status=ok animal_id={} guardian_id={}",
            animal.id, animal.guardian_id
        );
        Ok(animal)
    }

    /// Creates an appointment for an existing animal.
    ///
    /// # Errors
    /// - `MissingField` for absent `scheduled_at`, `veterinarian` or `animal_id`.
    /// - `InvalidFormat` when `scheduled_at` is not `DD-MM-YYYY HH:mm`.
    /// - `DuplicateId` when `draft.id` is already used.
    /// - `InvalidId` when `draft.id` is not in `1..=MAX_EXPLICIT_ID`.
    /// - `NotFound` when the animal does not exist.
    pub fn create_appointment(&mut self, draft: &NewAppointment) -> ClinicResult<Appointment> {
        let appointment = self.write("appointment_create", |tx| {
            let fields = draft.validate()?;
            explicit_id(EntityKind::Appointment, draft.id)?;
            let appointments = SqliteAppointmentRepository::new(tx);
            if let Some(id) = draft.id {
                if appointments.appointment_exists(id)? {
                    return Err(ClinicError::DuplicateId(EntityKind::Appointment, id));
                }
            }
            ensure_animal_exists(tx, fields.animal_id)?;
            Ok(appointments.insert_appointment(draft.id, &fields)?)
        })?;

        info!(
            "event=appointment_create module=service status=ok appointment_id={} animal_id={}",
            appointment.id, appointment.animal_id
        );
        Ok(appointment)
    }

    /// Applies a partial update to one guardian.
    pub fn update_guardian(
        &mut self,
        id: GuardianId,
        patch: &GuardianPatch,
    ) -> ClinicResult<Guardian> {
        let guardian = self.write("guardian_update", |tx| patch_guardian(tx, id, patch))?;
        info!("event=guardian_update module=service status=ok guardian_id={id}");
        Ok(guardian)
    }

    /// Applies a partial update to one animal.
    ///
    /// A `guardian_id` in the patch relinks the animal; the guardian must exist.
    pub fn update_animal(&mut self, id: AnimalId, patch: &AnimalPatch) -> ClinicResult<AnimalRecord> {
        let record = self.write("animal_update", |tx| {
            patch_animal(tx, id, patch)?;
            load_animal(tx, id)
        })?;
        info!("event=animal_update module=service status=ok animal_id={id}");
        Ok(record)
    }

    /// Applies a partial update to one appointment.
    ///
    /// An `animal_id` in the patch relinks the appointment; the animal must exist.
    pub fn update_appointment(
        &mut self,
        id: AppointmentId,
        patch: &AppointmentPatch,
    ) -> ClinicResult<AppointmentRecord> {
        let record = self.write("appointment_update", |tx| {
            patch_appointment(tx, id, patch)?;
            load_appointment(tx, id)
        })?;
        info!("event=appointment_update module=service status=ok appointment_id={id}");
        Ok(record)
    }

    /// Updates an appointment, its animal and that animal's guardian at once.
    ///
    /// Sub-updates are applied in order appointment -> animal -> guardian, each
    /// against the record linked at that point. Any failure rolls back all
    /// three.
    pub fn update_appointment_cascading(
        &mut self,
        id: AppointmentId,
        patch: &AppointmentCascadePatch,
    ) -> ClinicResult<AppointmentRecord> {
        let record = self.write("appointment_cascade_update", |tx| {
            let appointment = patch_appointment(tx, id, &patch.appointment)?;

            if let Some(animal_patch) = patch.animal.as_ref() {
                patch_animal(tx, appointment.animal_id, animal_patch)?;
            }

            if let Some(guardian_patch) = patch.guardian.as_ref() {
                let animal = load_animal(tx, appointment.animal_id)?;
                patch_guardian(tx, animal.guardian_id, guardian_patch)?;
            }

            load_appointment(tx, id)
        })?;

        info!(
            "event=appointment_cascade_update module=service status=ok appointment_id={id} animal_id={} animal_patched={} guardian_patched={}",
            record.animal_id,
            patch.animal.is_some(),
            patch.guardian.is_some()
        );
        Ok(record)
    }

    /// Deletes a guardian with all of its animals and their appointments.
    pub fn delete_guardian(&mut self, id: GuardianId) -> ClinicResult<DeletionReport> {
        let report = self.write("guardian_delete", |tx| {
            let plan = plan_guardian_deletion(tx, id)?;
            execute_deletion(tx, &plan)?;
            Ok(plan)
        })?;
        log_deletion("guardian_delete", &report);
        Ok(report)
    }

    /// Deletes an animal with all of its appointments.
    pub fn delete_animal(&mut self, id: AnimalId) -> ClinicResult<DeletionReport> {
        let report = self.write("animal_delete", |tx| {
            let plan = plan_animal_deletion(tx, id)?;
            execute_deletion(tx, &plan)?;
            Ok(plan)
        })?;
        log_deletion("animal_delete", &report);
        Ok(report)
    }

    /// Deletes one appointment.
    pub fn delete_appointment(&mut self, id: AppointmentId) -> ClinicResult<DeletionReport> {
        let report = self.write("appointment_delete", |tx| {
            let plan = DeletionReport {
                appointments: vec![id],
                ..DeletionReport::default()
            };
            execute_deletion(tx, &plan)?;
            Ok(plan)
        })?;
        log_deletion("appointment_delete", &report);
        Ok(report)
    }
}

fn log_deletion(event: &'static str, report: &DeletionReport) {
    info!(
        "event={event} module=service status=ok guardians_removed={} animals_removed={} appointments_removed={}",
        report.guardians.len(),
        report.animals.len(),
        report.appointments.len()
    );
}

/// Collects a guardian and every transitive dependent.
///
/// # Errors
/// - `NotFound` when the guardian does not exist.
pub(crate) fn plan_guardian_deletion(
    conn: &Connection,
    id: GuardianId,
) -> ClinicResult<DeletionReport> {
    ensure_guardian_exists(conn, id)?;

    let mut plan = DeletionReport {
        guardians: vec![id],
        ..DeletionReport::default()
    };
    let appointments = SqliteAppointmentRepository::new(conn);
    for animal in SqliteAnimalRepository::new(conn).animals_of_guardian(id)? {
        plan.appointments
            .extend(appointments.appointment_ids_of_animal(animal.id)?);
        plan.animals.push(animal.id);
    }
    Ok(plan)
}

/// Collects an animal and its appointments.
///
/// # Errors
/// - `NotFound` when the animal does not exist.
pub(crate) fn plan_animal_deletion(conn: &Connection, id: AnimalId) -> ClinicResult<DeletionReport> {
    ensure_animal_exists(conn, id)?;

    Ok(DeletionReport {
        animals: vec![id],
        appointments: SqliteAppointmentRepository::new(conn).appointment_ids_of_animal(id)?,
        ..DeletionReport::default()
    })
}

/// Deletes planned rows leaves first.
fn execute_deletion(conn: &Connection, plan: &DeletionReport) -> ClinicResult<()> {
    let appointments = SqliteAppointmentRepository::new(conn);
    for id in &plan.appointments {
        appointments.delete_appointment(*id)?;
    }

    let animals = SqliteAnimalRepository::new(conn);
    for id in &plan.animals {
        animals.delete_animal(*id)?;
    }

    let guardians = SqliteGuardianRepository::new(conn);
    for id in &plan.guardians {
        guardians.delete_guardian(*id)?;
    }
    Ok(())
}

fn patch_guardian(conn: &Connection, id: GuardianId, patch: &GuardianPatch) -> ClinicResult<Guardian> {
    let guardians = SqliteGuardianRepository::new(conn);
    let mut guardian = guardians
        .get_guardian(id)?
        .ok_or_else(|| ClinicError::not_found(EntityKind::Guardian, id))?;

    if !patch.is_empty() {
        patch.apply(&mut guardian)?;
        guardians.update_guardian(&guardian)?;
    }
    Ok(guardian)
}

fn patch_animal(conn: &Connection, id: AnimalId, patch: &AnimalPatch) -> ClinicResult<Animal> {
    let mut animal = load_animal(conn, id)?.to_animal();

    if !patch.is_empty() {
        patch.apply(&mut animal)?;
        if patch.guardian_id.is_some() {
            ensure_guardian_exists(conn, animal.guardian_id)?;
        }
        SqliteAnimalRepository::new(conn).update_animal(&animal)?;
    }
    Ok(animal)
}

fn patch_appointment(
    conn: &Connection,
    id: AppointmentId,
    patch: &AppointmentPatch,
) -> ClinicResult<Appointment> {
    let mut appointment = load_appointment(conn, id)?.to_appointment();

    if !patch.is_empty() {
        patch.apply(&mut appointment)?;
        if patch.animal_id.is_some() {
            ensure_animal_exists(conn, appointment.animal_id)?;
        }
        SqliteAppointmentRepository::new(conn).update_appointment(&appointment)?;
    }
    Ok(appointment)
}

fn load_animal(conn: &Connection, id: AnimalId) -> ClinicResult<AnimalRecord> {
    SqliteAnimalRepository::new(conn)
        .get_animal(id)?
        .ok_or_else(|| ClinicError::not_found(EntityKind::Animal, id))
}

fn load_appointment(conn: &Connection, id: AppointmentId) -> ClinicResult<AppointmentRecord> {
    SqliteAppointmentRepository::new(conn)
        .get_appointment(id)?
        .ok_or_else(|| ClinicError::not_found(EntityKind::Appointment, id))
}

fn ensure_guardian_exists(conn: &Connection, id: GuardianId) -> ClinicResult<()> {
    if SqliteGuardianRepository::new(conn).guardian_exists(id)? {
        Ok(())
    } else {
        Err(ClinicError::not_found(EntityKind::Guardian, id))
    }
}

fn ensure_animal_exists(conn: &Connection, id: AnimalId) -> ClinicResult<()> {
    if SqliteAnimalRepository::new(conn).animal_exists(id)? {
        Ok(())
    } else {
        Err(ClinicError::not_found(EntityKind::Animal, id))
    }
}
