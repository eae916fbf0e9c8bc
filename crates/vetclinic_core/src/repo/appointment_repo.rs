//! Appointment repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist appointments with a sortable `scheduled_at` text column.
//! - Serve day-level lookups as an index-friendly half-open range scan.
//!
//! # Invariants
//! - `scheduled_at` is stored as `YYYY-MM-DD HH:MM`; any other persisted
//!   shape is reported as `InvalidData`, never masked.
//! - Listing order is `scheduled_at ASC, id ASC`.

use super::{delete_by_id, id_exists, RepoError, RepoResult};
use crate::model::animal::AnimalId;
use crate::model::appointment::{Appointment, AppointmentFields, AppointmentId, AppointmentRecord};
use crate::model::EntityKind;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};

const TABLE: &str = "appointments";
const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M";

const APPOINTMENT_RECORD_SELECT_SQL: &str = "SELECT
    ap.id AS id,
    ap.scheduled_at AS scheduled_at,
    ap.veterinarian AS veterinarian,
    ap.animal_id AS animal_id,
    an.name AS animal_name,
    an.guardian_id AS guardian_id,
    g.name AS guardian_name
FROM appointments ap
LEFT JOIN animals an ON an.id = ap.animal_id
LEFT JOIN guardians g ON g.id = an.guardian_id";

const ORDER_SQL: &str = " ORDER BY ap.scheduled_at ASC, ap.id ASC;";

/// Repository interface for appointment rows.
pub trait AppointmentRepository {
    /// Inserts one appointment; `id = None` lets SQLite assign the next id.
    fn insert_appointment(
        &self,
        id: Option<AppointmentId>,
        fields: &AppointmentFields,
    ) -> RepoResult<Appointment>;
    /// Rewrites every column of an existing appointment.
    fn update_appointment(&self, appointment: &Appointment) -> RepoResult<()>;
    fn get_appointment(&self, id: AppointmentId) -> RepoResult<Option<AppointmentRecord>>;
    fn appointment_exists(&self, id: AppointmentId) -> RepoResult<bool>;
    /// Returns denormalized appointments accepted by `predicate`.
    fn query_appointments(
        &self,
        predicate: &dyn Fn(&AppointmentRecord) -> bool,
    ) -> RepoResult<Vec<AppointmentRecord>>;
    /// Appointments whose `scheduled_at` falls on `date`, any time of day.
    fn appointments_on(&self, date: NaiveDate) -> RepoResult<Vec<AppointmentRecord>>;
    fn appointment_ids_of_animal(&self, animal_id: AnimalId) -> RepoResult<Vec<AppointmentId>>;
    fn delete_appointment(&self, id: AppointmentId) -> RepoResult<()>;
}

/// SQLite-backed appointment repository.
pub struct SqliteAppointmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAppointmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn collect(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<AppointmentRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut appointments = Vec::new();
        while let Some(row) = rows.next()? {
            appointments.push(parse_appointment_row(row)?);
        }
        Ok(appointments)
    }
}

impl AppointmentRepository for SqliteAppointmentRepository<'_> {
    fn insert_appointment(
        &self,
        id: Option<AppointmentId>,
        fields: &AppointmentFields,
    ) -> RepoResult<Appointment> {
        self.conn.execute(
            "INSERT INTO appointments (id, scheduled_at, veterinarian, animal_id)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id,
                to_storage(&fields.scheduled_at),
                fields.veterinarian.as_str(),
                fields.animal_id,
            ],
        )?;

        Ok(Appointment {
            id: self.conn.last_insert_rowid(),
            scheduled_at: fields.scheduled_at,
            veterinarian: fields.veterinarian.clone(),
            animal_id: fields.animal_id,
        })
    }

    fn update_appointment(&self, appointment: &Appointment) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE appointments
             SET
                scheduled_at = ?1,
                veterinarian = ?2,
                animal_id = ?3
             WHERE id = ?4;",
            params![
                to_storage(&appointment.scheduled_at),
                appointment.veterinarian.as_str(),
                appointment.animal_id,
                appointment.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::Appointment, appointment.id));
        }

        Ok(())
    }

    fn get_appointment(&self, id: AppointmentId) -> RepoResult<Option<AppointmentRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{APPOINTMENT_RECORD_SELECT_SQL} WHERE ap.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_appointment_row(row)?));
        }

        Ok(None)
    }

    fn appointment_exists(&self, id: AppointmentId) -> RepoResult<bool> {
        id_exists(self.conn, TABLE, id)
    }

    fn query_appointments(
        &self,
        predicate: &dyn Fn(&AppointmentRecord) -> bool,
    ) -> RepoResult<Vec<AppointmentRecord>> {
        let mut appointments =
            self.collect(&format!("{APPOINTMENT_RECORD_SELECT_SQL}{ORDER_SQL}"), [])?;
        appointments.retain(|appointment| predicate(appointment));
        Ok(appointments)
    }

    fn appointments_on(&self, date: NaiveDate) -> RepoResult<Vec<AppointmentRecord>> {
        let day_start = date.and_time(chrono::NaiveTime::MIN);
        let next_day_start = date
            .succ_opt()
            .map(|next| to_storage(&next.and_time(chrono::NaiveTime::MIN)));

        match next_day_start {
            Some(upper) => self.collect(
                &format!(
                    "{APPOINTMENT_RECORD_SELECT_SQL}
                     WHERE ap.scheduled_at >= ?1 AND ap.scheduled_at < ?2{ORDER_SQL}"
                ),
                params![to_storage(&day_start), upper],
            ),
            // `date` is the last representable day.
            None => self.collect(
                &format!("{APPOINTMENT_RECORD_SELECT_SQL} WHERE ap.scheduled_at >= ?1{ORDER_SQL}"),
                params![to_storage(&day_start)],
            ),
        }
    }

    fn appointment_ids_of_animal(&self, animal_id: AnimalId) -> RepoResult<Vec<AppointmentId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM appointments WHERE animal_id = ?1 ORDER BY id ASC;")?;
        let ids = stmt
            .query_map([animal_id], |row| row.get::<_, AppointmentId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn delete_appointment(&self, id: AppointmentId) -> RepoResult<()> {
        delete_by_id(self.conn, EntityKind::Appointment, TABLE, id)
    }
}

fn to_storage(value: &NaiveDateTime) -> String {
    value.format(STORAGE_FORMAT).to_string()
}

fn parse_appointment_row(row: &Row<'_>) -> RepoResult<AppointmentRecord> {
    let id: AppointmentId = row.get("id")?;
    let scheduled_text: String = row.get("scheduled_at")?;
    let scheduled_at =
        NaiveDateTime::parse_from_str(&scheduled_text, STORAGE_FORMAT).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid scheduled_at value `{scheduled_text}` in appointments.scheduled_at (id {id})"
            ))
        })?;

    Ok(AppointmentRecord {
        id,
        scheduled_at,
        veterinarian: row.get("veterinarian")?,
        animal_id: row.get("animal_id")?,
        animal_name: row.get("animal_name")?,
        guardian_id: row.get("guardian_id")?,
        guardian_name: row.get("guardian_name")?,
    })
}
