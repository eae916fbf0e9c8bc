//! Guardian repository contract and SQLite implementation.

use super::{delete_by_id, id_exists, RepoError, RepoResult};
use crate::model::guardian::{Guardian, GuardianId};
use crate::model::EntityKind;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TABLE: &str = "guardians";

/// Repository interface for guardian rows.
pub trait GuardianRepository {
    /// Inserts one guardian; `id = None` lets SQLite assign the next id.
    fn insert_guardian(&self, id: Option<GuardianId>, name: &str) -> RepoResult<Guardian>;
    /// Rewrites every column of an existing guardian.
    fn update_guardian(&self, guardian: &Guardian) -> RepoResult<()>;
    fn get_guardian(&self, id: GuardianId) -> RepoResult<Option<Guardian>>;
    fn guardian_exists(&self, id: GuardianId) -> RepoResult<bool>;
    /// Returns guardians accepted by `predicate`, ordered by id.
    fn query_guardians(&self, predicate: &dyn Fn(&Guardian) -> bool) -> RepoResult<Vec<Guardian>>;
    /// Deletes one row. Fails if animals still reference it.
    fn delete_guardian(&self, id: GuardianId) -> RepoResult<()>;
}

/// SQLite-backed guardian repository.
pub struct SqliteGuardianRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGuardianRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl GuardianRepository for SqliteGuardianRepository<'_> {
    fn insert_guardian(&self, id: Option<GuardianId>, name: &str) -> RepoResult<Guardian> {
        self.conn.execute(
            "INSERT INTO guardians (id, name) VALUES (?1, ?2);",
            params![id, name],
        )?;

        Ok(Guardian {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn update_guardian(&self, guardian: &Guardian) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE guardians SET name = ?1 WHERE id = ?2;",
            params![guardian.name.as_str(), guardian.id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::Guardian, guardian.id));
        }

        Ok(())
    }

    fn get_guardian(&self, id: GuardianId) -> RepoResult<Option<Guardian>> {
        let guardian = self
            .conn
            .query_row(
                "SELECT id, name FROM guardians WHERE id = ?1;",
                [id],
                parse_guardian_row,
            )
            .optional()?;
        Ok(guardian)
    }

    fn guardian_exists(&self, id: GuardianId) -> RepoResult<bool> {
        id_exists(self.conn, TABLE, id)
    }

    fn query_guardians(&self, predicate: &dyn Fn(&Guardian) -> bool) -> RepoResult<Vec<Guardian>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM guardians ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut guardians = Vec::new();

        while let Some(row) = rows.next()? {
            let guardian = parse_guardian_row(row)?;
            if predicate(&guardian) {
                guardians.push(guardian);
            }
        }

        Ok(guardians)
    }

    fn delete_guardian(&self, id: GuardianId) -> RepoResult<()> {
        delete_by_id(self.conn, EntityKind::Guardian, TABLE, id)
    }
}

fn parse_guardian_row(row: &Row<'_>) -> rusqlite::Result<Guardian> {
    Ok(Guardian {
        id: row.get("id")?,
        name: row.get("name")?,
    })
}
