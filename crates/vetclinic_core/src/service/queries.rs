//! Read-side use-cases: id lookups, substring searches and filters.
//!
//! # Invariants
//! - Substring matches are case-insensitive over full Unicode text.
//! - Filters return an empty list, never `NotFound`, when nothing matches.
//!   Only id lookups and `animals_of_guardian` report `NotFound`.

use super::{ClinicError, ClinicResult, ClinicService, Lookup};
use crate::model::animal::{AnimalId, AnimalRecord};
use crate::model::appointment::{AppointmentId, AppointmentRecord};
use crate::model::guardian::{Guardian, GuardianId};
use crate::model::{contains_ignore_case, EntityKind};
use crate::repo::animal_repo::{AnimalRepository, SqliteAnimalRepository};
use crate::repo::appointment_repo::{AppointmentRepository, SqliteAppointmentRepository};
use crate::repo::guardian_repo::{GuardianRepository, SqliteGuardianRepository};
use crate::temporal;
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

/// Any clinic record, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Guardian(Guardian),
    Animal(AnimalRecord),
    Appointment(AppointmentRecord),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Guardian(_) => EntityKind::Guardian,
            Self::Animal(_) => EntityKind::Animal,
            Self::Appointment(_) => EntityKind::Appointment,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Guardian(guardian) => guardian.id,
            Self::Animal(animal) => animal.id,
            Self::Appointment(appointment) => appointment.id,
        }
    }
}

/// A resolved guardian with its animals, possibly none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardianAnimals {
    pub guardian: Guardian,
    pub animals: Vec<AnimalRecord>,
}

impl ClinicService<'_> {
    pub fn get_guardian(&self, id: GuardianId) -> ClinicResult<Guardian> {
        SqliteGuardianRepository::new(self.reader())
            .get_guardian(id)?
            .ok_or_else(|| ClinicError::not_found(EntityKind::Guardian, id))
    }

    pub fn get_animal(&self, id: AnimalId) -> ClinicResult<AnimalRecord> {
        SqliteAnimalRepository::new(self.reader())
            .get_animal(id)?
            .ok_or_else(|| ClinicError::not_found(EntityKind::Animal, id))
    }

    pub fn get_appointment(&self, id: AppointmentId) -> ClinicResult<AppointmentRecord> {
        SqliteAppointmentRepository::new(self.reader())
            .get_appointment(id)?
            .ok_or_else(|| ClinicError::not_found(EntityKind::Appointment, id))
    }

    /// Exact-id lookup for any entity kind.
    pub fn get_by_id(&self, kind: EntityKind, id: i64) -> ClinicResult<Entity> {
        match kind {
            EntityKind::Guardian => self.get_guardian(id).map(Entity::Guardian),
            EntityKind::Animal => self.get_animal(id).map(Entity::Animal),
            EntityKind::Appointment => self.get_appointment(id).map(Entity::Appointment),
        }
    }

    pub fn list_guardians(&self) -> ClinicResult<Vec<Guardian>> {
        let guardians = SqliteGuardianRepository::new(self.reader());
        Ok(guardians.query_guardians(&|_: &Guardian| true)?)
    }

    pub fn list_animals(&self) -> ClinicResult<Vec<AnimalRecord>> {
        let animals = SqliteAnimalRepository::new(self.reader());
        Ok(animals.query_animals(&|_: &AnimalRecord| true)?)
    }

    pub fn list_appointments(&self) -> ClinicResult<Vec<AppointmentRecord>> {
        let appointments = SqliteAppointmentRepository::new(self.reader());
        Ok(appointments.query_appointments(&|_: &AppointmentRecord| true)?)
    }

    pub fn search_guardians(&self, fragment: &str) -> ClinicResult<Vec<Guardian>> {
        let guardians = SqliteGuardianRepository::new(self.reader()).query_guardians(
            &|guardian: &Guardian| contains_ignore_case(&guardian.name, fragment),
        )?;
        log_search("guardian_search", fragment, guardians.len());
        Ok(guardians)
    }

    pub fn search_animals(&self, fragment: &str) -> ClinicResult<Vec<AnimalRecord>> {
        let animals = SqliteAnimalRepository::new(self.reader()).query_animals(
            &|animal: &AnimalRecord| contains_ignore_case(&animal.name, fragment),
        )?;
        log_search("animal_search", fragment, animals.len());
        Ok(animals)
    }

    /// Case-insensitive name search for any entity kind.
    ///
    /// Appointments are matched on the veterinarian's name.
    pub fn search_by_name(&self, kind: EntityKind, fragment: &str) -> ClinicResult<Vec<Entity>> {
        let entities = match kind {
            EntityKind::Guardian => self
                .search_guardians(fragment)?
                .into_iter()
                .map(Entity::Guardian)
                .collect(),
            EntityKind::Animal => self
                .search_animals(fragment)?
                .into_iter()
                .map(Entity::Animal)
                .collect(),
            EntityKind::Appointment => self
                .filter_appointments_by_veterinarian(fragment)?
                .into_iter()
                .map(Entity::Appointment)
                .collect(),
        };
        Ok(entities)
    }

    /// Resolves the first guardian (lowest id) whose name contains `fragment`
    /// and returns its animals.
    ///
    /// # Errors
    /// - `NotFound` when no guardian name matches. A matching guardian without
    ///   animals is a success with an empty `animals` list.
    pub fn animals_of_guardian(&self, fragment: &str) -> ClinicResult<GuardianAnimals> {
        let guardian = self
            .search_guardians(fragment)?
            .into_iter()
            .next()
            .ok_or_else(|| ClinicError::NotFound {
                kind: EntityKind::Guardian,
                lookup: Lookup::Name(fragment.trim().to_string()),
            })?;
        let animals = SqliteAnimalRepository::new(self.reader()).animals_of_guardian(guardian.id)?;
        Ok(GuardianAnimals { guardian, animals })
    }

    pub fn filter_by_species(&self, fragment: &str) -> ClinicResult<Vec<AnimalRecord>> {
        let animals = SqliteAnimalRepository::new(self.reader()).query_animals(
            &|animal: &AnimalRecord| contains_ignore_case(&animal.species, fragment),
        )?;
        log_search("animal_species_filter", fragment, animals.len());
        Ok(animals)
    }

    /// Appointments on `date`, regardless of time of day.
    pub fn filter_appointments_by_calendar_date(
        &self,
        date: NaiveDate,
    ) -> ClinicResult<Vec<AppointmentRecord>> {
        let appointments = SqliteAppointmentRepository::new(self.reader()).appointments_on(date)?;
        debug!(
            "event=appointment_date_filter module=service status=ok date={} hits={}",
            date,
            appointments.len()
        );
        Ok(appointments)
    }

    /// Text variant of the date filter; `text` must be `DD-MM-YYYY`.
    pub fn filter_appointments_by_date_text(
        &self,
        text: &str,
    ) -> ClinicResult<Vec<AppointmentRecord>> {
        let date = temporal::parse_date(text).map_err(|source| ClinicError::InvalidFormat {
            field: "date",
            source,
        })?;
        self.filter_appointments_by_calendar_date(date)
    }

    pub fn filter_appointments_by_veterinarian(
        &self,
        fragment: &str,
    ) -> ClinicResult<Vec<AppointmentRecord>> {
        let appointments = SqliteAppointmentRepository::new(self.reader()).query_appointments(
            &|appointment: &AppointmentRecord| {
                contains_ignore_case(&appointment.veterinarian, fragment)
            },
        )?;
        log_search("appointment_veterinarian_filter", fragment, appointments.len());
        Ok(appointments)
    }
}

fn log_search(event: &'static str, fragment: &str, hits: usize) {
    // Fragments are user text; log only their length.
    debug!(
        "event={event} module=service status=ok fragment_chars={} hits={hits}",
        fragment.chars().count()
    );
}
