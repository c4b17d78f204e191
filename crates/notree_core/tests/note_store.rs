use notree_core::db::open_db_in_memory;
use notree_core::{
    ChildRow, Note, NoteId, NoteRef, NoteStore, RowState, SqliteNoteStore, StoreError,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn add_titled(store: &SqliteNoteStore<'_>, parent: NoteRef, title: &str) -> NoteId {
    let mut note = store.add(parent).unwrap();
    note.set_content(title, None);
    store.update(&note).unwrap().id
}

fn child_ids(store: &SqliteNoteStore<'_>, parent: NoteRef) -> Vec<NoteId> {
    store
        .list_children(parent)
        .unwrap()
        .into_iter()
        .map(|row| row.id)
        .collect()
}

#[test]
fn add_creates_empty_live_note() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let note = store.add(NoteRef::Root).unwrap();
    assert_eq!(note.parent, NoteRef::Root);
    assert_eq!(note.title, "");
    assert_eq!(note.body, None);
    assert_eq!(note.modified, None);
    assert_eq!(note.state, RowState::Live);
    assert!(note.created > 0);

    let parent_column: Option<i64> = conn
        .query_row("SELECT parent FROM notes WHERE id = ?1;", [note.id.get()], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(parent_column, None);
}

#[test]
fn add_under_unknown_parent_is_constraint_violation() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let err = store
        .add(NoteRef::Stored(NoteId::new(404).unwrap()))
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));
    assert!(store.list_children(NoteRef::Root).unwrap().is_empty());
}

#[test]
fn ids_are_never_reused() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let first = store.add(NoteRef::Root).unwrap();
    conn.execute("DELETE FROM notes WHERE id = ?1;", [first.id.get()])
        .unwrap();
    let second = store.add(NoteRef::Root).unwrap();
    assert!(second.id > first.id);
}

#[test]
fn get_root_returns_synthetic_note_and_unknown_id_fails() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    assert_eq!(store.get(NoteRef::Root).unwrap(), Note::Root);

    let missing = NoteId::new(99).unwrap();
    let err = store.get(NoteRef::Stored(missing)).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(id) if id == missing));
}

#[test]
fn update_round_trip_keeps_created_and_sets_modified() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let created = store.add(NoteRef::Root).unwrap();
    let mut edited = created.clone();
    edited.set_content("T", Some("B".to_string()));
    store.update(&edited).unwrap();

    let loaded = store.get_stored(created.id).unwrap();
    assert_eq!(loaded.title, "T");
    assert_eq!(loaded.body.as_deref(), Some("B"));
    assert_eq!(loaded.created, created.created);
    let modified = loaded.modified.expect("modified should be set after update");
    assert!(modified >= loaded.created);
    assert_eq!(loaded.state, RowState::Edited);
    assert_eq!(loaded.parent, NoteRef::Root);
}

#[test]
fn update_normalizes_empty_body_to_absent() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let mut note = store.add(NoteRef::Root).unwrap();
    note.title = "Empty".to_string();
    note.body = Some(String::new());
    let saved = store.update(&note).unwrap();
    assert_eq!(saved.body, None);

    let raw_body: Option<String> = conn
        .query_row("SELECT body FROM notes WHERE id = ?1;", [note.id.get()], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(raw_body, None);
}

#[test]
fn update_never_moves_a_note() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let a = add_titled(&store, NoteRef::Root, "A");
    let b = add_titled(&store, NoteRef::Root, "B");
    let mut child = store.add(NoteRef::Stored(a)).unwrap();
    child.parent = NoteRef::Stored(b);
    child.title = "child".to_string();

    let saved = store.update(&child).unwrap();
    assert_eq!(saved.parent, NoteRef::Stored(a));
    assert!(child_ids(&store, NoteRef::Stored(b)).is_empty());
}

#[test]
fn update_unknown_id_is_not_found() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let mut note = store.add(NoteRef::Root).unwrap();
    note.id = NoteId::new(note.id.get() + 100).unwrap();
    let err = store.update(&note).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn list_children_keeps_insertion_order() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let parent = add_titled(&store, NoteRef::Root, "Parent");
    let zeta = add_titled(&store, NoteRef::Stored(parent), "Zeta");
    let alpha = add_titled(&store, NoteRef::Stored(parent), "Alpha");
    let mid = add_titled(&store, NoteRef::Stored(parent), "Mid");

    // Editing the first child must not reorder it.
    let mut first = store.get_stored(zeta).unwrap();
    first.set_content("Zeta 2", None);
    store.update(&first).unwrap();

    let rows = store.list_children(NoteRef::Stored(parent)).unwrap();
    assert_eq!(
        rows,
        vec![
            ChildRow {
                id: zeta,
                title: "Zeta 2".to_string()
            },
            ChildRow {
                id: alpha,
                title: "Alpha".to_string()
            },
            ChildRow {
                id: mid,
                title: "Mid".to_string()
            },
        ]
    );
    assert_eq!(store.count_children(NoteRef::Stored(parent)).unwrap(), 3);
    assert_eq!(child_ids(&store, NoteRef::Root), vec![parent]);
}

#[test]
fn soft_delete_hides_whole_subtree() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let a = add_titled(&store, NoteRef::Root, "A");
    let keep = add_titled(&store, NoteRef::Root, "Keep");
    let b = add_titled(&store, NoteRef::Stored(a), "B");
    let c = add_titled(&store, NoteRef::Stored(b), "C");
    let d = add_titled(&store, NoteRef::Stored(c), "D");

    store.soft_delete(a).unwrap();

    assert_eq!(child_ids(&store, NoteRef::Root), vec![keep]);
    for parent in [a, b, c, d] {
        assert!(child_ids(&store, NoteRef::Stored(parent)).is_empty());
        assert_eq!(store.count_children(NoteRef::Stored(parent)).unwrap(), 0);
    }
    for descendant in [b, c, d] {
        let note = store.get_stored(descendant).unwrap();
        assert!(note.is_deleted(), "descendant {descendant} should be flagged");
    }
    assert!(!store.get_stored(keep).unwrap().is_deleted());
}

#[test]
fn listing_hides_live_rows_under_a_deleted_ancestor() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let a = add_titled(&store, NoteRef::Root, "A");
    let b = add_titled(&store, NoteRef::Stored(a), "B");
    let c = add_titled(&store, NoteRef::Stored(b), "C");

    // Only the top row flagged, as another writer might leave it.
    conn.execute("UPDATE notes SET alive = -1 WHERE id = ?1;", [a.get()])
        .unwrap();

    assert!(child_ids(&store, NoteRef::Stored(b)).is_empty());
    assert!(store.get_stored(b).unwrap().is_deleted());
    assert!(store.get_stored(c).unwrap().is_deleted());
}

#[test]
fn rows_added_under_deleted_parent_read_back_as_deleted() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let a = add_titled(&store, NoteRef::Root, "A");
    store.soft_delete(a).unwrap();
    let late = store.add(NoteRef::Stored(a)).unwrap();

    assert!(late.is_deleted());
    assert!(store.get_stored(late.id).unwrap().is_deleted());
    assert!(child_ids(&store, NoteRef::Stored(a)).is_empty());
}

#[test]
fn soft_delete_is_idempotent() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let a = add_titled(&store, NoteRef::Root, "A");
    let b = add_titled(&store, NoteRef::Stored(a), "B");
    let other = add_titled(&store, NoteRef::Root, "Other");

    store.soft_delete(b).unwrap();
    let after_once = (child_ids(&store, NoteRef::Root), child_ids(&store, NoteRef::Stored(a)));
    store.soft_delete(b).unwrap();
    let after_twice = (child_ids(&store, NoteRef::Root), child_ids(&store, NoteRef::Stored(a)));

    assert_eq!(after_once, after_twice);
    assert_eq!(after_twice.0, vec![a, other]);
    assert!(after_twice.1.is_empty());
}

#[test]
fn soft_delete_unknown_id_is_not_found() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let err = store.soft_delete(NoteId::new(5).unwrap()).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn update_does_not_resurrect_deleted_note() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let a = add_titled(&store, NoteRef::Root, "A");
    store.soft_delete(a).unwrap();

    let mut note = store.get_stored(a).unwrap();
    note.set_content("A again", None);
    let saved = store.update(&note).unwrap();
    assert!(saved.is_deleted());
    assert!(child_ids(&store, NoteRef::Root).is_empty());
}

#[test]
fn soft_delete_reaches_rows_added_under_deleted_parent() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let a = add_titled(&store, NoteRef::Root, "A");
    let b = add_titled(&store, NoteRef::Stored(a), "B");
    store.soft_delete(b).unwrap();
    let late = add_titled(&store, NoteRef::Stored(b), "Late");

    assert!(child_ids(&store, NoteRef::Stored(b)).is_empty());
    store.soft_delete(a).unwrap();
    assert!(store.get_stored(late).unwrap().is_deleted());
}

#[test]
fn physical_delete_cascades_through_foreign_key() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let a = add_titled(&store, NoteRef::Root, "A");
    let b = add_titled(&store, NoteRef::Stored(a), "B");
    let c = add_titled(&store, NoteRef::Stored(b), "C");

    conn.execute("DELETE FROM notes WHERE id = ?1;", [a.get()])
        .unwrap();
    for gone in [a, b, c] {
        assert!(matches!(
            store.get_stored(gone).unwrap_err(),
            StoreError::NotFound(_)
        ));
    }
}

#[test]
fn ancestors_are_ordered_from_the_top() {
    let conn = setup();
    let store = SqliteNoteStore::try_new(&conn).unwrap();

    let a = add_titled(&store, NoteRef::Root, "A");
    let b = add_titled(&store, NoteRef::Stored(a), "B");
    let c = add_titled(&store, NoteRef::Stored(b), "C");

    let chain = store
        .ancestors(c)
        .unwrap()
        .into_iter()
        .map(|note| note.id)
        .collect::<Vec<_>>();
    assert_eq!(chain, vec![a, b]);
    assert!(store.ancestors(a).unwrap().is_empty());
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notree.db");

    let id = {
        let conn = notree_core::open_store_db(&path).unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        add_titled(&store, NoteRef::Root, "Persisted")
    };

    let conn = notree_core::open_store_db(&path).unwrap();
    let store = SqliteNoteStore::try_new(&conn).unwrap();
    assert_eq!(store.get_stored(id).unwrap().title, "Persisted");
    assert_eq!(child_ids(&store, NoteRef::Root), vec![id]);
}
