//! Planner store: connection bootstrap and schema versioning.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version` and only moves forward.
//! - No repository sees a connection whose migrations have not all applied.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or upgrading the planner store.
#[derive(Debug)]
pub enum DbError {
    /// Connection setup or pragma failure.
    Sqlite(rusqlite::Error),
    /// The file was written by a newer planner build.
    SchemaTooNew { found: u32, supported: u32 },
    /// Migration `version` failed; the store stays at its previous version.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "planner store error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "planner store is at schema {found} but this build only knows up to {supported}"
            ),
            Self::Migration { version, source } => {
                write!(f, "planner schema migration {version} failed: {source}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
