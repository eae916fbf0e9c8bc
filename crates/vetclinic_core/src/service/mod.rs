//! Clinic use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into create/read/update/delete use-cases.
//! - Own the transaction boundary for every logical operation.
//! - Map storage outcomes into the client-facing error taxonomy.
//!
//! # Invariants
//! - Every mutation (including cascaded effects) runs in one `IMMEDIATE`
//!   transaction; an error anywhere rolls back all of it.
//! - The store handle is injected by the caller, never a process global.

mod integrity;
mod queries;

pub use integrity::DeletionReport;
pub use queries::{Entity, GuardianAnimals};

use crate::db::{ensure_schema_ready, DbError};
use crate::model::{EntityKind, ValidationError, MAX_EXPLICIT_ID};
use crate::repo::RepoError;
use crate::temporal::TemporalError;
use log::{error, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ClinicResult<T> = Result<T, ClinicError>;

/// How a missing record was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(i64),
    /// Case-insensitive name fragment.
    Name(String),
}

impl Display for Lookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Name(fragment) => write!(f, "name matching `{fragment}`"),
        }
    }
}

/// Errors from clinic service operations.
#[derive(Debug)]
pub enum ClinicError {
    /// Referenced record is absent.
    NotFound { kind: EntityKind, lookup: Lookup },
    /// Caller-supplied id is already used.
    DuplicateId(EntityKind, i64),
    /// Caller-supplied id is outside `1..=MAX_EXPLICIT_ID`.
    InvalidId(EntityKind, i64),
    /// Date/date-time text does not match the wire pattern.
    InvalidFormat {
        field: &'static str,
        source: TemporalError,
    },
    /// Required creation field absent or blank.
    MissingField {
        kind: EntityKind,
        field: &'static str,
    },
    /// Store-level fault. Never a client mistake.
    StorageFailure(RepoError),
}

impl ClinicError {
    pub(crate) fn not_found(kind: EntityKind, id: i64) -> Self {
        Self::NotFound {
            kind,
            lookup: Lookup::Id(id),
        }
    }

    /// Whether the error was caused by caller input rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::StorageFailure(_))
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::DuplicateId(..) => "duplicate_id",
            Self::InvalidId(..) => "invalid_id",
            Self::InvalidFormat { .. } => "invalid_format",
            Self::MissingField { .. } => "missing_field",
            Self::StorageFailure(_) => "storage_failure",
        }
    }
}

impl Display for ClinicError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, lookup } => write!(f, "{kind} not found: {lookup}"),
            Self::DuplicateId(kind, id) => write!(f, "{kind} id {id} is already in use"),
            Self::InvalidId(kind, id) => {
                write!(f, "{kind} id {id} is outside 1..={MAX_EXPLICIT_ID}")
            }
            Self::InvalidFormat { field, source } => write!(f, "{field}: {source}"),
            Self::MissingField { kind, field } => {
                write!(f, "{kind}.{field} is required and must not be blank")
            }
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for ClinicError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidFormat { source, .. } => Some(source),
            Self::StorageFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ClinicError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(kind, id) => Self::not_found(kind, id),
            other => Self::StorageFailure(other),
        }
    }
}

impl From<DbError> for ClinicError {
    fn from(value: DbError) -> Self {
        Self::StorageFailure(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for ClinicError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageFailure(RepoError::from(value))
    }
}

impl From<ValidationError> for ClinicError {
    fn from(value: ValidationError) -> Self {
        match value {
            ValidationError::MissingField { kind, field } => Self::MissingField { kind, field },
            ValidationError::InvalidFormat { field, source, .. } => {
                Self::InvalidFormat { field, source }
            }
            ValidationError::IdOutOfRange { kind, id } => Self::InvalidId(kind, id),
        }
    }
}

/// Clinic service facade over an injected SQLite connection.
pub struct ClinicService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> ClinicService<'conn> {
    /// Wraps a connection opened through `db::open_db*`.
    ///
    /// Fails with `StorageFailure` when the schema is not the latest version.
    pub fn try_new(conn: &'conn mut Connection) -> ClinicResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn reader(&self) -> &Connection {
        &*self.conn
    }

    /// Runs `op` in one immediate transaction, committing only on success.
    fn write<T>(
        &mut self,
        event: &'static str,
        op: impl FnOnce(&Transaction<'_>) -> ClinicResult<T>,
    ) -> ClinicResult<T> {
        let result = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(ClinicError::from)
            .and_then(|tx| {
                let value = op(&tx)?;
                tx.commit()?;
                Ok(value)
            });

        if let Err(err) = &result {
            log_failure(event, err);
        }
        result
    }
}

fn log_failure(event: &'static str, err: &ClinicError) {
    if err.is_client_error() {
        warn!(
            "event={event} module=service status=rejected error_code={} error={err}",
            err.code()
        );
    } else {
        error!(
            "event={event} module=service status=error error_code={} error={err}",
            err.code()
        );
    }
}
