//! Tree navigation service.
//!
//! # Responsibility
//! - Track which note the user has drilled into.
//! - Derive the header/children view and the body view the UI renders.
//! - Route add/edit/delete gestures to the store.
//!
//! # Invariants
//! - Views are derived from an explicit `&Note` on every call; nothing is
//!   cached, so a view never outlives the state it was built from.
//! - The children view of a stored note starts with exactly one
//!   non-interactive header row; the root view has none.
//! - The root is never edited or deleted.
//! - Deleting the current note (or one of its ancestors) moves the
//!   navigator to the deleted note's parent.

use crate::model::note::{Note, NoteId, NoteRef, StoredNote};
use crate::repo::note_store::{NoteStore, StoreError, StoreResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Role of a row inside a derived view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// The current note shown above its own children.
    Header,
    /// A live child that can be drilled into.
    Child,
    /// The current note's body rendered as a pseudo-child.
    Body,
}

/// One renderable row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRow {
    pub id: NoteId,
    pub text: String,
    pub kind: RowKind,
}

impl ViewRow {
    fn child(id: NoteId, text: String) -> Self {
        Self {
            id,
            text,
            kind: RowKind::Child,
        }
    }

    /// Only child rows react to a tap.
    pub fn is_interactive(&self) -> bool {
        self.kind == RowKind::Child
    }
}

/// Result of a "go back" gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    /// Moved one level up.
    Moved,
    /// Already at the root; the session is over.
    SessionEnded,
}

/// Header row (stored notes only) followed by the live children of `current`.
pub fn children_view<S: NoteStore + ?Sized>(
    store: &S,
    current: &Note,
) -> StoreResult<Vec<ViewRow>> {
    let mut rows = Vec::new();
    if let Note::Stored(note) = current {
        rows.push(ViewRow {
            id: note.id,
            text: note.title.clone(),
            kind: RowKind::Header,
        });
    }
    rows.extend(
        store
            .list_children(current.id())?
            .into_iter()
            .map(|child| ViewRow::child(child.id, child.title)),
    );
    Ok(rows)
}

/// Zero or one body row for `current`.
pub fn body_view(current: &Note) -> Vec<ViewRow> {
    match current {
        Note::Stored(StoredNote {
            id,
            body: Some(body),
            ..
        }) => vec![ViewRow {
            id: *id,
            text: body.clone(),
            kind: RowKind::Body,
        }],
        _ => Vec::new(),
    }
}

/// Second level of the two-level list under the row `row_id`.
///
/// The header expands to the body view; any other row expands to its own
/// live children.
pub fn expand_row<S: NoteStore + ?Sized>(
    store: &S,
    current: &Note,
    row_id: NoteId,
) -> StoreResult<Vec<ViewRow>> {
    if current.id() == NoteRef::Stored(row_id) {
        return Ok(body_view(current));
    }
    Ok(store
        .list_children(NoteRef::Stored(row_id))?
        .into_iter()
        .map(|child| ViewRow::child(child.id, child.title))
        .collect())
}

/// Navigator facade over a note store.
pub struct TreeNavigator<S: NoteStore> {
    store: S,
    current: Note,
}

impl<S: NoteStore> TreeNavigator<S> {
    /// Starts a session at the root.
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: Note::Root,
        }
    }

    /// Starts a session at an externally supplied id (deep link).
    ///
    /// Unknown, soft-deleted, or malformed ids fall back to the root, since a
    /// stale link may point into a deleted subtree.
    pub fn open(store: S, raw_id: i64) -> StoreResult<Self> {
        let mut navigator = Self::new(store);
        match NoteRef::from_raw(raw_id) {
            Ok(target) => navigator.move_to_or_root(target)?,
            Err(err) => warn!(
                "event=nav_open module=navigator status=fallback reason=invalid_id error={err}"
            ),
        }
        Ok(navigator)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current(&self) -> &Note {
        &self.current
    }

    /// Replaces the current note; fails exactly like [`NoteStore::get`].
    pub fn set_current(&mut self, id: NoteRef) -> StoreResult<()> {
        self.current = self.store.get(id)?;
        debug!("event=nav_move module=navigator status=ok current={id}");
        Ok(())
    }

    /// Handles a tap on row `id`. Returns `false` for the header no-op.
    ///
    /// A row that vanished or was deleted since the view was built lands on
    /// the root.
    pub fn select(&mut self, id: NoteId) -> StoreResult<bool> {
        if self.current.id() == NoteRef::Stored(id) {
            return Ok(false);
        }
        self.move_to_or_root(NoteRef::Stored(id))?;
        Ok(true)
    }

    /// Walks one level up the ancestor chain.
    pub fn go_back(&mut self) -> StoreResult<BackOutcome> {
        match self.current.parent() {
            None => {
                debug!("event=nav_back module=navigator status=session_end");
                Ok(BackOutcome::SessionEnded)
            }
            Some(parent) => {
                self.move_to_or_root(parent)?;
                Ok(BackOutcome::Moved)
            }
        }
    }

    pub fn children_view(&self) -> StoreResult<Vec<ViewRow>> {
        children_view(&self.store, &self.current)
    }

    pub fn body_view(&self) -> Vec<ViewRow> {
        body_view(&self.current)
    }

    pub fn expand(&self, row_id: NoteId) -> StoreResult<Vec<ViewRow>> {
        expand_row(&self.store, &self.current, row_id)
    }

    /// Whether expanding `row_id` yields anything: the body for the header,
    /// live children for any other row.
    pub fn has_nested_rows(&self, row_id: NoteId) -> StoreResult<bool> {
        if self.current.id() == NoteRef::Stored(row_id) {
            return Ok(!body_view(&self.current).is_empty());
        }
        Ok(self.store.count_children(NoteRef::Stored(row_id))? > 0)
    }

    /// Titles from the top-level ancestor down to the current note.
    pub fn breadcrumbs(&self) -> StoreResult<Vec<String>> {
        let Note::Stored(note) = &self.current else {
            return Ok(Vec::new());
        };
        let mut crumbs = self
            .store
            .ancestors(note.id)?
            .into_iter()
            .map(|ancestor| ancestor.title)
            .collect::<Vec<_>>();
        crumbs.push(note.title.clone());
        Ok(crumbs)
    }

    /// Creates an empty note under the current one; the caller edits it next.
    pub fn add_child(&mut self) -> StoreResult<StoredNote> {
        self.store.add(self.current.id())
    }

    /// Replaces title and body of `id`; an empty body is stored as absent.
    pub fn edit(
        &mut self,
        id: NoteId,
        title: impl Into<String>,
        body: Option<String>,
    ) -> StoreResult<StoredNote> {
        let mut note = self.store.get_stored(id)?;
        note.set_content(title, body);
        let saved = self.store.update(&note)?;
        if self.current.id() == NoteRef::Stored(id) {
            self.current = Note::Stored(saved.clone());
        }
        Ok(saved)
    }

    pub fn edit_current(
        &mut self,
        title: impl Into<String>,
        body: Option<String>,
    ) -> StoreResult<StoredNote> {
        match self.current.id() {
            NoteRef::Root => Err(StoreError::ConstraintViolation(
                "the root note cannot be edited".to_string(),
            )),
            NoteRef::Stored(id) => self.edit(id, title, body),
        }
    }

    /// Soft-deletes `id` and its subtree.
    ///
    /// When the current note disappears with it, the navigator moves to the
    /// deleted note's parent.
    pub fn delete(&mut self, id: NoteId) -> StoreResult<()> {
        let target = self.store.get_stored(id)?;
        let current_affected = self.is_at_or_below(id)?;
        self.store.soft_delete(id)?;
        if current_affected {
            self.move_to_or_root(target.parent)?;
        }
        Ok(())
    }

    pub fn delete_current(&mut self) -> StoreResult<()> {
        match self.current.id() {
            NoteRef::Root => Err(StoreError::ConstraintViolation(
                "the root note cannot be deleted".to_string(),
            )),
            NoteRef::Stored(id) => self.delete(id),
        }
    }

    fn is_at_or_below(&self, id: NoteId) -> StoreResult<bool> {
        let Note::Stored(current) = &self.current else {
            return Ok(false);
        };
        if current.id == id {
            return Ok(true);
        }
        Ok(self
            .store
            .ancestors(current.id)?
            .iter()
            .any(|ancestor| ancestor.id == id))
    }

    fn move_to_or_root(&mut self, target: NoteRef) -> StoreResult<()> {
        match self.store.get(target) {
            Ok(Note::Stored(note)) if note.is_deleted() => {
                warn!(
                    "event=nav_move module=navigator status=fallback reason=deleted target={target}"
                );
                self.current = Note::Root;
            }
            Ok(note) => {
                debug!("event=nav_move module=navigator status=ok current={target}");
                self.current = note;
            }
            Err(StoreError::NotFound(_)) => {
                warn!(
                    "event=nav_move module=navigator status=fallback reason=not_found target={target}"
                );
                self.current = Note::Root;
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }
}
