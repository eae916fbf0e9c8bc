//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the clinic store.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Clinic records are never read or written before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

use migrations::{current_user_version, latest_version};
use rusqlite::Connection;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Database was written by a newer binary.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Connection was not bootstrapped through `open_db*`.
    SchemaNotReady { expected: u32, actual: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaNotReady { expected, actual } => write!(
                f,
                "clinic store requires schema version {expected}, got {actual}; open it with open_db"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::SchemaNotReady { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Fails unless `conn` is migrated to exactly the latest known schema and
/// enforces foreign keys.
pub fn ensure_schema_ready(conn: &Connection) -> DbResult<()> {
    let actual = current_user_version(conn)?;
    let expected = latest_version();
    if actual != expected {
        return Err(DbError::SchemaNotReady { expected, actual });
    }
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}
