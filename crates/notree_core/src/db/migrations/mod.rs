//! Ordered `notes` schema upgrades.
//!
//! Version 1 creates the table; version 2 indexes `(parent, id)` so child
//! listing in insertion order never scans the whole tree.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per step.
//! - All pending steps run in one transaction; `PRAGMA user_version` moves
//!   with each step inside it, so a rollback restores the old version too.

use crate::db::{DbError, DbResult};
use log::{debug, error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("0001_notes.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("0002_notes_parent_index.sql"),
    },
];

/// Schema version a freshly opened database ends up at.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is ahead of this build.
/// - `MigrationFailed` naming the first step that did not apply.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();

    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }
    if from_version == latest {
        debug!("event=db_migrate module=db status=skip version={from_version}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > from_version) {
        let step = format!(
            "{}\nPRAGMA user_version = {};",
            migration.sql, migration.version
        );
        if let Err(source) = tx.execute_batch(&step) {
            error!(
                "event=db_migrate module=db status=error version={} error={}",
                migration.version, source
            );
            return Err(DbError::MigrationFailed {
                version: migration.version,
                source,
            });
        }
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from_version} to_version={latest}");
    Ok(())
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}
