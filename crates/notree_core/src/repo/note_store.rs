//! Note store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the `notes` table with cascade-aware visibility.
//! - Keep SQL details and ordering behavior inside the store boundary.
//!
//! # Invariants
//! - Child listing is insertion order (`id ASC`) and hides soft-deleted
//!   rows together with everything below them.
//! - `soft_delete` flags a whole subtree in one IMMEDIATE transaction, so a
//!   reader never sees a half-applied cascade.
//! - `update` never moves a note and never resurrects a deleted one.
//! - Point lookup by id still returns soft-deleted rows (flagged
//!   `RowState::Deleted`); only listings hide them. A row below a deleted
//!   ancestor reads back as deleted even when its own flag is still live.

use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::note::{normalize_body, Note, NoteId, NoteRef, RowState, StoredNote};
use log::{debug, info};
use rusqlite::{
    params, Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Current time in epoch milliseconds, evaluated by SQLite.
const NOW_MS_SQL: &str = "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)";

const NOTE_COLUMNS: [&str; 7] = [
    "id", "alive", "parent", "created", "modified", "title", "body",
];

/// Result type used by note store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from note store and navigator operations.
#[derive(Debug)]
pub enum StoreError {
    /// No row with this id exists.
    NotFound(NoteId),
    /// Insert/update broke a schema rule (unknown parent, root mutation, ...).
    ConstraintViolation(String),
    /// Backing database could not be opened or bootstrapped.
    StorageUnavailable(DbError),
    /// Any other SQLite failure.
    Db(DbError),
    /// Persisted data cannot be converted to a valid note.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::StorageUnavailable(err) => write!(f, "note storage unavailable: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid note data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "note store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "note store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "note store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) | Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => err.into(),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(err, message)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(message.unwrap_or_else(|| err.to_string()))
            }
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

/// Opens (creating if needed) a note database file ready for [`SqliteNoteStore`].
///
/// Any failure here is reported as `StorageUnavailable`; callers must not
/// serve views without a store.
pub fn open_store_db(path: impl AsRef<Path>) -> StoreResult<Connection> {
    open_db(path).map_err(StoreError::StorageUnavailable)
}

/// In-memory variant of [`open_store_db`].
pub fn open_store_db_in_memory() -> StoreResult<Connection> {
    open_db_in_memory().map_err(StoreError::StorageUnavailable)
}

/// One row of a child listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRow {
    pub id: NoteId,
    pub title: String,
}

/// Store interface consumed by the navigator.
pub trait NoteStore {
    /// Loads one stored row by id, deleted or not.
    ///
    /// Rows inside a deleted subtree come back as `RowState::Deleted`.
    fn get_stored(&self, id: NoteId) -> StoreResult<StoredNote>;
    /// Lists visible direct children of `parent` in insertion order.
    fn list_children(&self, parent: NoteRef) -> StoreResult<Vec<ChildRow>>;
    /// Counts what [`NoteStore::list_children`] would return.
    fn count_children(&self, parent: NoteRef) -> StoreResult<usize>;
    /// Creates an empty note under `parent`.
    fn add(&self, parent: NoteRef) -> StoreResult<StoredNote>;
    /// Persists title and body of an existing note and stamps `modified`.
    fn update(&self, note: &StoredNote) -> StoreResult<StoredNote>;
    /// Soft-deletes `id` and its whole subtree.
    fn soft_delete(&self, id: NoteId) -> StoreResult<()>;
    /// Stored ancestors of `id`, root-most first, excluding `id` itself.
    fn ancestors(&self, id: NoteId) -> StoreResult<Vec<StoredNote>>;

    /// Loads a tree position; `NoteRef::Root` yields the synthetic root.
    fn get(&self, id: NoteRef) -> StoreResult<Note> {
        match id {
            NoteRef::Root => Ok(Note::Root),
            NoteRef::Stored(id) => self.get_stored(id).map(Note::Stored),
        }
    }
}

/// SQLite-backed note store.
#[derive(Debug, Clone, Copy)]
pub struct SqliteNoteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Creates a store over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn is_hidden(&self, id: NoteId) -> StoreResult<bool> {
        let hidden: i64 = self.conn.query_row(
            "WITH RECURSIVE chain(id, parent, alive) AS (
                SELECT id, parent, alive
                FROM notes
                WHERE id = ?1
                UNION ALL
                SELECT n.id, n.parent, n.alive
                FROM notes n
                INNER JOIN chain c ON n.id = c.parent
            )
            SELECT EXISTS(SELECT 1 FROM chain WHERE alive < 0);",
            [id.get()],
            |row| row.get(0),
        )?;
        Ok(hidden == 1)
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn get_stored(&self, id: NoteId) -> StoreResult<StoredNote> {
        let mut note = load_note(self.conn, id)?.ok_or(StoreError::NotFound(id))?;
        // A live row under a deleted ancestor is gone together with it.
        if !note.is_deleted() && self.is_hidden(id)? {
            note.state = RowState::Deleted;
        }
        Ok(note)
    }

    fn list_children(&self, parent: NoteRef) -> StoreResult<Vec<ChildRow>> {
        let mut items = Vec::new();
        match parent {
            NoteRef::Root => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, title
                     FROM notes
                     WHERE parent IS NULL
                       AND alive >= 0
                     ORDER BY id ASC;",
                )?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    items.push(parse_child_row(row)?);
                }
            }
            NoteRef::Stored(parent_id) => {
                if self.is_hidden(parent_id)? {
                    return Ok(items);
                }
                let mut stmt = self.conn.prepare(
                    "SELECT id, title
                     FROM notes
                     WHERE parent = ?1
                       AND alive >= 0
                     ORDER BY id ASC;",
                )?;
                let mut rows = stmt.query([parent_id.get()])?;
                while let Some(row) = rows.next()? {
                    items.push(parse_child_row(row)?);
                }
            }
        }
        Ok(items)
    }

    fn count_children(&self, parent: NoteRef) -> StoreResult<usize> {
        let count: i64 = match parent {
            NoteRef::Root => self.conn.query_row(
                "SELECT COUNT(*) FROM notes WHERE parent IS NULL AND alive >= 0;",
                [],
                |row| row.get(0),
            )?,
            NoteRef::Stored(parent_id) => {
                if self.is_hidden(parent_id)? {
                    return Ok(0);
                }
                self.conn.query_row(
                    "SELECT COUNT(*) FROM notes WHERE parent = ?1 AND alive >= 0;",
                    [parent_id.get()],
                    |row| row.get(0),
                )?
            }
        };
        usize::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("negative child count {count}")))
    }

    fn add(&self, parent: NoteRef) -> StoreResult<StoredNote> {
        let inserted = self.conn.execute(
            &format!(
                "INSERT INTO notes (alive, parent, created, modified, title, body)
                 VALUES (?1, ?2, {NOW_MS_SQL}, NULL, '', NULL);"
            ),
            params![RowState::Live.to_db(), parent.stored().map(NoteId::get)],
        );
        if let Err(err) = inserted {
            debug!("event=note_add module=store status=error parent={parent} error={err}");
            return Err(err.into());
        }

        let raw_id = self.conn.last_insert_rowid();
        let id = NoteId::new(raw_id).ok_or_else(|| {
            StoreError::InvalidData(format!("non-positive generated id {raw_id}"))
        })?;
        info!("event=note_add module=store status=ok id={id} parent={parent}");
        self.get_stored(id)
    }

    fn update(&self, note: &StoredNote) -> StoreResult<StoredNote> {
        let body = normalize_body(note.body.clone());
        let changed = self.conn.execute(
            &format!(
                "UPDATE notes
                 SET title = ?2,
                     body = ?3,
                     modified = {NOW_MS_SQL},
                     alive = CASE WHEN alive < 0 THEN alive ELSE ?4 END
                 WHERE id = ?1;"
            ),
            params![
                note.id.get(),
                note.title.as_str(),
                body.as_deref(),
                RowState::Edited.to_db(),
            ],
        )?;
        if changed == 0 {
            debug!("event=note_update module=store status=not_found id={}", note.id);
            return Err(StoreError::NotFound(note.id));
        }

        info!(
            "event=note_update module=store status=ok id={} has_body={}",
            note.id,
            body.is_some()
        );
        self.get_stored(note.id)
    }

    fn soft_delete(&self, id: NoteId) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let exists: Option<i64> = tx
            .query_row("SELECT id FROM notes WHERE id = ?1;", [id.get()], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::NotFound(id));
        }

        let flagged = tx.execute(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id
                FROM notes
                WHERE id = ?1
                UNION ALL
                SELECT child.id
                FROM notes child
                INNER JOIN subtree parent ON child.parent = parent.id
            )
            UPDATE notes
            SET alive = ?2
            WHERE id IN (SELECT id FROM subtree)
              AND alive >= 0;",
            params![id.get(), RowState::Deleted.to_db()],
        )?;
        tx.commit()?;

        info!("event=note_soft_delete module=store status=ok id={id} flagged={flagged}");
        Ok(())
    }

    fn ancestors(&self, id: NoteId) -> StoreResult<Vec<StoredNote>> {
        let mut stmt = self.conn.prepare(
            "WITH RECURSIVE chain(id, depth) AS (
                SELECT parent, 1
                FROM notes
                WHERE id = ?1
                UNION ALL
                SELECT n.parent, c.depth + 1
                FROM notes n
                INNER JOIN chain c ON n.id = c.id
            )
            SELECT notes.id, notes.alive, notes.parent, notes.created,
                   notes.modified, notes.title, notes.body
            FROM chain
            INNER JOIN notes ON notes.id = chain.id
            ORDER BY chain.depth DESC;",
        )?;
        let mut rows = stmt.query([id.get()])?;
        let mut chain = Vec::new();
        while let Some(row) = rows.next()? {
            chain.push(parse_note_row(row)?);
        }
        Ok(chain)
    }
}

fn load_note(conn: &Connection, id: NoteId) -> StoreResult<Option<StoredNote>> {
    let mut stmt = conn.prepare(
        "SELECT id, alive, parent, created, modified, title, body
         FROM notes
         WHERE id = ?1;",
    )?;
    let mut rows = stmt.query([id.get()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_note_row(row)?));
    }
    Ok(None)
}

fn parse_note_row(row: &Row<'_>) -> StoreResult<StoredNote> {
    let raw_id: i64 = row.get("id")?;
    let id = NoteId::new(raw_id)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid id `{raw_id}` in notes.id")))?;

    let parent = match row.get::<_, Option<i64>>("parent")? {
        None => NoteRef::Root,
        Some(raw) => NoteRef::Stored(NoteId::new(raw).ok_or_else(|| {
            StoreError::InvalidData(format!("invalid parent `{raw}` in notes.parent"))
        })?),
    };

    Ok(StoredNote {
        id,
        parent,
        created: row.get("created")?,
        modified: row.get("modified")?,
        title: row.get("title")?,
        body: normalize_body(row.get("body")?),
        state: RowState::from_db(row.get("alive")?),
    })
}

fn parse_child_row(row: &Row<'_>) -> StoreResult<ChildRow> {
    let raw_id: i64 = row.get("id")?;
    let id = NoteId::new(raw_id)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid id `{raw_id}` in notes.id")))?;
    Ok(ChildRow {
        id,
        title: row.get("title")?,
    })
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "notes")? {
        return Err(StoreError::MissingRequiredTable("notes"));
    }
    for column in NOTE_COLUMNS {
        if !table_has_column(conn, "notes", column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
