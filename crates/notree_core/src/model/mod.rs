//! Domain model for the note tree.
//!
//! # Responsibility
//! - Define the canonical note shapes used by store and navigator.
//!
//! # Invariants
//! - Every stored note is identified by a store-assigned `NoteId`.
//! - The root is a `Note::Root` variant, never a sentinel id flowing into
//!   row queries.
//! - Deletion is a soft-delete flag on the row, not a physical delete.

pub mod note;
