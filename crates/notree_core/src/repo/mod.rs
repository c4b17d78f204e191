//! Repository layer: persistence contracts and their SQLite implementation.
//!
//! # Responsibility
//! - Define the note store contract consumed by the navigator.
//! - Isolate SQLite query details from navigation logic.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`, `ConstraintViolation`)
//!   in addition to DB transport errors.
//! - Nothing is retried internally.

pub mod note_store;
