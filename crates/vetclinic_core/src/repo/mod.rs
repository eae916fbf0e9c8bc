//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define get/put/delete/query contracts per clinic entity.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories never cascade; dependents are handled by the service layer.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Repositories take a plain `&Connection`, so they run unchanged inside a
//!   caller-owned transaction.

pub mod animal_repo;
pub mod appointment_repo;
pub mod guardian_repo;

use crate::db::DbError;
use crate::model::EntityKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for clinic persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(EntityKind, i64),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(kind, id) => write!(f, "{kind} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted clinic data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(..) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn id_exists(
    conn: &rusqlite::Connection,
    table: &'static str,
    id: i64,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn delete_by_id(
    conn: &rusqlite::Connection,
    kind: EntityKind,
    table: &'static str,
    id: i64,
) -> RepoResult<()> {
    let changed = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1;"), [id])?;
    if changed == 0 {
        return Err(RepoError::NotFound(kind, id));
    }
    Ok(())
}
