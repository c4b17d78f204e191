//! Note domain model.
//!
//! # Responsibility
//! - Define the stored note record and the virtual root that sits above it.
//! - Encode row liveness as a typed tri-state instead of a raw integer.
//!
//! # Invariants
//! - `NoteId` is always positive; `NULL_ID` (0) is never a stored id.
//! - The root is a variant, never a row: it has no parent, an empty title,
//!   no body, and cannot be edited or deleted.
//! - `body` is never `Some("")`; see [`normalize_body`].

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Raw id value denoting "no note", i.e. the virtual root.
pub const NULL_ID: i64 = 0;

/// Store-assigned identifier of a stored note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct NoteId(i64);

impl NoteId {
    /// Wraps a raw id; `None` for `NULL_ID` and negative values.
    pub fn new(raw: i64) -> Option<Self> {
        (raw > NULL_ID).then_some(Self(raw))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for NoteId {
    type Error = InvalidNoteId;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidNoteId(value))
    }
}

impl From<NoteId> for i64 {
    fn from(value: NoteId) -> Self {
        value.0
    }
}

/// Raw id that cannot name a stored note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidNoteId(pub i64);

impl Display for InvalidNoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid note id: {}", self.0)
    }
}

impl Error for InvalidNoteId {}

/// Position in the tree: the virtual root or one stored note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum NoteRef {
    Root,
    Stored(NoteId),
}

impl NoteRef {
    /// Decodes an external id (deep link, UI row id).
    ///
    /// `NULL_ID` maps to `Root`; negative values are rejected.
    pub fn from_raw(raw: i64) -> Result<Self, InvalidNoteId> {
        if raw == NULL_ID {
            Ok(Self::Root)
        } else {
            NoteId::try_from(raw).map(Self::Stored)
        }
    }

    pub fn to_raw(self) -> i64 {
        match self {
            Self::Root => NULL_ID,
            Self::Stored(id) => id.get(),
        }
    }

    pub fn is_root(self) -> bool {
        matches!(self, Self::Root)
    }

    pub fn stored(self) -> Option<NoteId> {
        match self {
            Self::Root => None,
            Self::Stored(id) => Some(id),
        }
    }
}

impl From<NoteId> for NoteRef {
    fn from(value: NoteId) -> Self {
        Self::Stored(value)
    }
}

impl TryFrom<i64> for NoteRef {
    type Error = InvalidNoteId;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_raw(value)
    }
}

impl From<NoteRef> for i64 {
    fn from(value: NoteRef) -> Self {
        value.to_raw()
    }
}

impl Display for NoteRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => f.write_str("root"),
            Self::Stored(id) => write!(f, "{id}"),
        }
    }
}

/// Liveness of a stored row, persisted in `notes.alive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    /// Created and untouched since (`alive = 0`).
    Live,
    /// Edited at least once (`alive > 0`).
    Edited,
    /// Soft-deleted (`alive < 0`); hidden together with its subtree.
    Deleted,
}

impl RowState {
    pub fn from_db(alive: i64) -> Self {
        match alive {
            0 => Self::Live,
            value if value > 0 => Self::Edited,
            _ => Self::Deleted,
        }
    }

    pub fn to_db(self) -> i64 {
        match self {
            Self::Live => 0,
            Self::Edited => 1,
            Self::Deleted => -1,
        }
    }

    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Deleted)
    }
}

/// One persisted note row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNote {
    pub id: NoteId,
    /// `NoteRef::Root` for top-level notes.
    pub parent: NoteRef,
    /// Epoch milliseconds, fixed at creation.
    pub created: i64,
    /// Epoch milliseconds of the last update; `None` until the first one.
    pub modified: Option<i64>,
    pub title: String,
    pub body: Option<String>,
    pub state: RowState,
}

impl StoredNote {
    pub fn is_deleted(&self) -> bool {
        self.state == RowState::Deleted
    }

    /// Replaces title and body, normalizing an empty body to `None`.
    pub fn set_content(&mut self, title: impl Into<String>, body: Option<String>) {
        self.title = title.into();
        self.body = normalize_body(body);
    }
}

/// A navigable tree position with its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "note", rename_all = "snake_case")]
pub enum Note {
    Root,
    Stored(StoredNote),
}

impl Note {
    pub fn id(&self) -> NoteRef {
        match self {
            Self::Root => NoteRef::Root,
            Self::Stored(note) => NoteRef::Stored(note.id),
        }
    }

    /// `None` only for the root.
    pub fn parent(&self) -> Option<NoteRef> {
        match self {
            Self::Root => None,
            Self::Stored(note) => Some(note.parent),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Root => "",
            Self::Stored(note) => note.title.as_str(),
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::Stored(note) => note.body.as_deref(),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    pub fn as_stored(&self) -> Option<&StoredNote> {
        match self {
            Self::Root => None,
            Self::Stored(note) => Some(note),
        }
    }
}

impl From<StoredNote> for Note {
    fn from(value: StoredNote) -> Self {
        Self::Stored(value)
    }
}

/// Maps an empty body to `None`; bodies are never stored as `""`.
pub fn normalize_body(body: Option<String>) -> Option<String> {
    body.filter(|value| !value.is_empty())
}
