//! Animal repository contract and SQLite implementation.
//!
//! # Invariants
//! - Read models come from a `LEFT JOIN` on guardians, so an animal whose
//!   guardian row vanished is still returned with `guardian_name = None`.
//! - Listing order is `id ASC`.

use super::{delete_by_id, id_exists, RepoError, RepoResult};
use crate::model::animal::{Animal, AnimalFields, AnimalId, AnimalRecord};
use crate::model::guardian::GuardianId;
use crate::model::EntityKind;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TABLE: &str = "animals";

const ANIMAL_RECORD_SELECT_SQL: &str = "SELECT
    a.id AS id,
    a.name AS name,
    a.species AS species,
    a.guardian_id AS guardian_id,
    g.name AS guardian_name
FROM animals a
LEFT JOIN guardians g ON g.id = a.guardian_id";

/// Repository interface for animal rows.
pub trait AnimalRepository {
    /// Inserts one animal; `id = None` lets SQLite assign the next id.
    fn insert_animal(&self, id: Option<AnimalId>, fields: &AnimalFields) -> RepoResult<Animal>;
    /// Rewrites every column of an existing animal.
    fn update_animal(&self, animal: &Animal) -> RepoResult<()>;
    fn get_animal(&self, id: AnimalId) -> RepoResult<Option<AnimalRecord>>;
    fn animal_exists(&self, id: AnimalId) -> RepoResult<bool>;
    /// Returns denormalized animals accepted by `predicate`, ordered by id.
    fn query_animals(
        &self,
        predicate: &dyn Fn(&AnimalRecord) -> bool,
    ) -> RepoResult<Vec<AnimalRecord>>;
    fn animals_of_guardian(&self, guardian_id: GuardianId) -> RepoResult<Vec<AnimalRecord>>;
    /// Deletes one row. Fails if appointments still reference it.
    fn delete_animal(&self, id: AnimalId) -> RepoResult<()>;
}

/// SQLite-backed animal repository.
pub struct SqliteAnimalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnimalRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn collect(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Vec<AnimalRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut animals = Vec::new();
        while let Some(row) = rows.next()? {
            animals.push(parse_animal_row(row)?);
        }
        Ok(animals)
    }
}

impl AnimalRepository for SqliteAnimalRepository<'_> {
    fn insert_animal(&self, id: Option<AnimalId>, fields: &AnimalFields) -> RepoResult<Animal> {
        self.conn.execute(
            "INSERT INTO animals (id, name, species, guardian_id) VALUES (?1, ?2, ?3, ?4);",
            params![
                id,
                fields.name.as_str(),
                fields.species.as_str(),
                fields.guardian_id,
            ],
        )?;

        Ok(Animal {
            id: self.conn.last_insert_rowid(),
            name: fields.name.clone(),
            species: fields.species.clone(),
            guardian_id: fields.guardian_id,
        })
    }

    fn update_animal(&self, animal: &Animal) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE animals
             SET
                name = ?1,
                species = ?2,
                guardian_id = ?3
             WHERE id = ?4;",
            params![
                animal.name.as_str(),
                animal.species.as_str(),
                animal.guardian_id,
                animal.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::Animal, animal.id));
        }

        Ok(())
    }

    fn get_animal(&self, id: AnimalId) -> RepoResult<Option<AnimalRecord>> {
        let animal = self
            .conn
            .query_row(
                &format!("{ANIMAL_RECORD_SELECT_SQL} WHERE a.id = ?1;"),
                [id],
                parse_animal_row,
            )
            .optional()?;
        Ok(animal)
    }

    fn animal_exists(&self, id: AnimalId) -> RepoResult<bool> {
        id_exists(self.conn, TABLE, id)
    }

    fn query_animals(
        &self,
        predicate: &dyn Fn(&AnimalRecord) -> bool,
    ) -> RepoResult<Vec<AnimalRecord>> {
        let mut animals =
            self.collect(&format!("{ANIMAL_RECORD_SELECT_SQL} ORDER BY a.id ASC;"), [])?;
        animals.retain(|animal| predicate(animal));
        Ok(animals)
    }

    fn animals_of_guardian(&self, guardian_id: GuardianId) -> RepoResult<Vec<AnimalRecord>> {
        self.collect(
            &format!("{ANIMAL_RECORD_SELECT_SQL} WHERE a.guardian_id = ?1 ORDER BY a.id ASC;"),
            [guardian_id],
        )
    }

    fn delete_animal(&self, id: AnimalId) -> RepoResult<()> {
        delete_by_id(self.conn, EntityKind::Animal, TABLE, id)
    }
}

fn parse_animal_row(row: &Row<'_>) -> rusqlite::Result<AnimalRecord> {
    Ok(AnimalRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        species: row.get("species")?,
        guardian_id: row.get("guardian_id")?,
        guardian_name: row.get("guardian_name")?,
    })
}
