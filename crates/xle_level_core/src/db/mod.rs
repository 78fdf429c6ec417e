//! Level document store.
//!
//! One SQLite database holds every persisted document (game roots and
//! placement cells), keyed by the location the editor uses to address it.
//! `open_db*` hands out bootstrapped connections; `migrations` owns the
//! `documents` table layout.
//!
//! # Invariants
//! - The store layout version lives in `PRAGMA user_version`.
//! - Repositories only accept connections whose layout is current.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Store bootstrap failures.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Store was written by a newer build of the editor.
    UnsupportedStoreVersion {
        store_version: u32,
        latest_supported: u32,
    },
    /// A layout step failed; the store keeps its previous version.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedStoreVersion {
                store_version,
                latest_supported,
            } => write!(
                f,
                "document store version {store_version} is newer than supported {latest_supported}"
            ),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "store migration {version} ({name}) failed: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Migration { source, .. } => Some(source),
            Self::UnsupportedStoreVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
