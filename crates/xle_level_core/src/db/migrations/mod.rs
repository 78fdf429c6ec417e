//! Document store layout steps.
//!
//! # Invariants
//! - Step versions are strictly increasing, starting at 1.
//! - All pending steps run in one transaction; a failing step leaves the
//!   store at its previous version.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "documents",
    sql: include_str!("0001_documents.sql"),
}];

/// Store layout version this build writes.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

fn pending(store_version: u32) -> impl Iterator<Item = &'static Migration> {
    MIGRATIONS
        .iter()
        .filter(move |migration| migration.version > store_version)
}

/// Brings the store layout up to `latest_version()`.
///
/// # Errors
/// - `UnsupportedStoreVersion` when the store is newer than this build.
/// - `Migration` naming the first step that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let store_version = read_store_version(conn)?;
    let latest = latest_version();
    if store_version > latest {
        return Err(DbError::UnsupportedStoreVersion {
            store_version,
            latest_supported: latest,
        });
    }
    if store_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending(store_version) {
        let step = format!(
            "{}\nPRAGMA user_version = {};",
            migration.sql, migration.version
        );
        if let Err(source) = tx.execute_batch(&step) {
            error!(
                "event=db_migrate module=db status=error version={} name={} error={}",
                migration.version, migration.name, source
            );
            return Err(DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            });
        }
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        store_version, latest
    );
    Ok(())
}

fn read_store_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}
