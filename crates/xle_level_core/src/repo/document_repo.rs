//! Document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist and load document node trees keyed by their location.
//! - Keep SQL and JSON encoding details inside the repository boundary.
//!
//! # Invariants
//! - Locations are stored byte-for-byte as given; only blank ones are rejected.
//! - Saving an existing location replaces its body (upsert).
//! - Read paths reject undecodable bodies instead of masking them.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::record::NodeRecord;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by document repository operations.
pub type DocumentRepoResult<T> = Result<T, DocumentRepoError>;

/// Errors from document repository operations.
#[derive(Debug)]
pub enum DocumentRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Location is empty or whitespace only.
    InvalidLocation(String),
    /// Node tree could not be encoded or decoded.
    Encoding(serde_json::Error),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for DocumentRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidLocation(value) => write!(f, "invalid document location `{value}`"),
            Self::Encoding(err) => write!(f, "document body encoding failed: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "document repository requires store version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "document repository requires table `{table}`")
            }
        }
    }
}

impl Error for DocumentRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encoding(err) => Some(err),
            Self::InvalidLocation(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for DocumentRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for DocumentRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for DocumentRepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encoding(value)
    }
}

/// Repository interface for persisted documents.
pub trait DocumentRepository {
    /// Loads the node tree stored at `location`, if any.
    fn load_document(&self, location: &str) -> DocumentRepoResult<Option<NodeRecord>>;
    /// Stores `root` at `location`, replacing any previous body.
    fn save_document(&self, location: &str, root: &NodeRecord) -> DocumentRepoResult<()>;
    /// Deletes the document at `location`. Returns whether a row was removed.
    fn delete_document(&self, location: &str) -> DocumentRepoResult<bool>;
    /// Lists stored locations in ascending order.
    fn list_locations(&self) -> DocumentRepoResult<Vec<String>>;
}

impl<R: DocumentRepository + ?Sized> DocumentRepository for &R {
    fn load_document(&self, location: &str) -> DocumentRepoResult<Option<NodeRecord>> {
        (**self).load_document(location)
    }

    fn save_document(&self, location: &str, root: &NodeRecord) -> DocumentRepoResult<()> {
        (**self).save_document(location, root)
    }

    fn delete_document(&self, location: &str) -> DocumentRepoResult<bool> {
        (**self).delete_document(location)
    }

    fn list_locations(&self) -> DocumentRepoResult<Vec<String>> {
        (**self).list_locations()
    }
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> DocumentRepoResult<Self> {
        ensure_document_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn load_document(&self, location: &str) -> DocumentRepoResult<Option<NodeRecord>> {
        ensure_location(location)?;
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body
                 FROM documents
                 WHERE uri = ?1;",
                [location],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            None => Ok(None),
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
        }
    }

    fn save_document(&self, location: &str, root: &NodeRecord) -> DocumentRepoResult<()> {
        ensure_location(location)?;
        let body = serde_json::to_string(root)?;
        self.conn.execute(
            "INSERT INTO documents (uri, root_type, body)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(uri) DO UPDATE SET
                root_type = excluded.root_type,
                body = excluded.body,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![location, root.type_name, body],
        )?;
        Ok(())
    }

    fn delete_document(&self, location: &str) -> DocumentRepoResult<bool> {
        ensure_location(location)?;
        let changed = self
            .conn
            .execute("DELETE FROM documents WHERE uri = ?1;", [location])?;
        Ok(changed > 0)
    }

    fn list_locations(&self) -> DocumentRepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uri FROM documents ORDER BY uri ASC;")?;
        let mut rows = stmt.query([])?;
        let mut locations = Vec::new();
        while let Some(row) = rows.next()? {
            locations.push(row.get(0)?);
        }
        Ok(locations)
    }
}

fn ensure_location(location: &str) -> DocumentRepoResult<()> {
    if location.trim().is_empty() {
        return Err(DocumentRepoError::InvalidLocation(location.to_string()));
    }
    Ok(())
}

fn ensure_document_connection_ready(conn: &Connection) -> DocumentRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(DocumentRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'documents'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(DocumentRepoError::MissingRequiredTable("documents"));
    }
    Ok(())
}
