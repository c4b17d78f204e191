//! Hierarchical note store and tree navigation core.
//! This crate owns the tree invariants; UI layers only call into it.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::note::{
    normalize_body, InvalidNoteId, Note, NoteId, NoteRef, RowState, StoredNote, NULL_ID,
};
pub use repo::note_store::{
    open_store_db, open_store_db_in_memory, ChildRow, NoteStore, SqliteNoteStore, StoreError,
    StoreResult,
};
pub use service::navigator::{
    body_view, children_view, expand_row, BackOutcome, RowKind, TreeNavigator, ViewRow,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
