//! Use-case services above the store.
//!
//! # Responsibility
//! - Turn UI gestures into store calls or navigation moves.
//! - Keep UI layers decoupled from storage details.

pub mod navigator;
