//! Integration tests: payload loading → transactional edits → rollback.
//!
//! Loads a two-panel figure from a fixture and checks that every failed or
//! abandoned transaction leaves the document untouched.

use pretty_assertions::assert_eq;
use sf_core::*;

const ROOT_LISTS: [Property; 3] = [Property::Files, Property::Resources, Property::Panels];

fn load() -> FigureDocument {
    let payloads: Vec<serde_json::Value> =
        serde_json::from_str(include_str!("fixtures/two_panels.json")).unwrap();
    let mut doc = FigureDocument::new();
    doc.transaction(|tx| {
        let root = tx.document().root_id();
        for payload in &payloads {
            let id = tx.create_from_json(payload)?;
            let kind = tx.entity(id)?.kind;
            let property = match kind {
                EntityKind::File => Property::Files,
                EntityKind::Resource => Property::Resources,
                _ => Property::Panels,
            };
            tx.append(&ListPath::new(root, property), id)?;
        }
        Ok(())
    })
    .unwrap();
    doc
}

fn id(s: &str) -> EntityId {
    EntityId::intern(s)
}

fn snapshot(doc: &FigureDocument) -> serde_json::Value {
    doc.to_json(doc.root_id()).unwrap()
}

// ─── Loading ─────────────────────────────────────────────────────────────

#[test]
fn fixture_loads_in_one_commit() {
    let doc = load();
    assert_eq!(doc.version(), 1);
    for property in ROOT_LISTS {
        let path = ListPath::new(doc.root_id(), property);
        assert!(!doc.list(&path).unwrap().is_empty());
    }
    let panel_a = doc.entity(id("panel_a")).unwrap();
    assert_eq!(panel_a.list(Property::Files), &[id("file_data")]);
    assert_eq!(doc.parent_of(id("kw_rat")), Some((id("group_a"), Property::Keywords)));
    assert_eq!(doc.position_of(id("panel_b")).unwrap(), 1);
}

// ─── Atomicity ───────────────────────────────────────────────────────────

#[test]
fn failed_transaction_restores_exact_state() {
    let mut doc = load();
    let before = snapshot(&doc);
    let keywords = ListPath::new(id("group_a"), Property::Keywords);

    let result: FigureResult<()> = doc.transaction(|tx| {
        tx.set(id("panel_a"), Property::Title, "changed")?;
        tx.remove_at(&keywords, 0)?;
        tx.deep_delete(id("panel_b"))?;
        tx.set_selection(Selection::node(id("panel_a")));
        // Fails: lists reject unknown entities.
        tx.append(&keywords, id("kw_missing"))?;
        Ok(())
    });

    assert_eq!(result, Err(FigureError::NotFound(id("kw_missing"))));
    assert_eq!(snapshot(&doc), before);
    assert_eq!(*doc.selection(), Selection::None);
    assert_eq!(doc.version(), 1);
    assert_eq!(doc.parent_of(id("kw_mouse")), Some((id("group_a"), Property::Keywords)));
}

#[test]
fn deleted_file_is_scrubbed_from_every_panel_and_restored_on_rollback() {
    let mut doc = load();
    let before = snapshot(&doc);

    {
        let mut tx = doc.begin();
        tx.deep_delete(id("file_data")).unwrap();
        assert!(tx.entity(id("panel_a")).unwrap().list(Property::Files).is_empty());
        assert!(tx.entity(id("panel_b")).unwrap().list(Property::Files).is_empty());
    }
    assert_eq!(snapshot(&doc), before);

    doc.transaction(|tx| tx.deep_delete(id("file_data"))).unwrap();
    assert!(!doc.contains(id("file_data")));
    assert!(doc.entity(id("panel_b")).unwrap().list(Property::Files).is_empty());
    let summary = doc.last_change().unwrap().summary();
    // root.files + two panel references
    assert_eq!(summary.removes, 3);
    // file + its legend paragraph
    assert_eq!(summary.deletes, 2);
}

#[test]
fn panel_image_cannot_be_deleted_on_its_own() {
    let mut doc = load();
    let err = doc.transaction(|tx| tx.deep_delete(id("image_a"))).unwrap_err();
    assert!(matches!(err, FigureError::InvalidStructure(_)));
    assert!(doc.contains(id("image_a")));
}

#[test]
fn committed_changes_are_listed_in_order() {
    let mut doc = load();
    let keywords = ListPath::new(id("group_a"), Property::Keywords);
    let set = {
        let mut tx = doc.begin();
        let moved = tx.remove_at(&keywords, 0).unwrap();
        tx.insert_at(&keywords, 1, moved).unwrap();
        tx.commit()
    };
    assert_eq!(set.version, 2);
    assert!(set.changes.iter().all(Change::is_structural));
    assert_eq!(doc.list(&keywords).unwrap(), &[id("kw_rat"), id("kw_mouse")]);
    assert_eq!(set.inserted_into(&keywords), vec![id("kw_mouse")]);
}
