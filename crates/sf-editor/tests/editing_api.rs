//! Integration tests: panels, files, resources and attachments through
//! `FigureApi`, backed by the in-memory archive.

use pretty_assertions::assert_eq;
use serde_json::json;
use sf_core::*;
use sf_editor::*;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn api() -> FigureApi<EditorSession> {
    init_logs();
    FigureApi::new(EditorSession::in_memory())
}

fn png(name: &str) -> FilePayload {
    FilePayload::new(name, "image/png", name.as_bytes().to_vec())
}

fn csv(name: &str) -> FilePayload {
    FilePayload::new(name, "text/csv", b"a,b\n1,2\n".to_vec())
}

fn root_list(api: &FigureApi<EditorSession>, property: Property) -> Vec<EntityId> {
    let path = ListPath::new(api.document().root_id(), property);
    api.document().list(&path).unwrap().to_vec()
}

fn image_src(api: &FigureApi<EditorSession>, panel: EntityId) -> String {
    let doc = api.document();
    let image = doc.entity(panel).unwrap().child(Property::Image).unwrap();
    doc.entity(image).unwrap().text(Property::Src).unwrap().to_string()
}

// ─── Panels ──────────────────────────────────────────────────────────────

#[test]
fn first_panel_gets_default_template() {
    let mut api = api();
    let panel = api.insert_panel(&png("a.png"), None).unwrap();

    assert_eq!(root_list(&api, Property::Panels), vec![panel]);
    assert_eq!(api.selection(), Selection::node(panel));

    let template = api.document().template_of(panel).unwrap();
    assert_eq!(template["image"]["mimeType"], json!("image/png"));
    assert_eq!(template["legend"], json!([{ "type": "paragraph" }]));
    let src = image_src(&api, panel);
    assert!(api.context().assets().get_asset(&AssetRef::new(src)).is_some());
}

#[test]
fn rejected_asset_leaves_document_untouched() {
    let mut api = api();
    let panel = api.insert_panel(&png("a.png"), None).unwrap();
    let version = api.document().version();
    let panels = root_list(&api, Property::Panels);
    let files = root_list(&api, Property::Files);
    let selection = api.selection();

    let err = api.insert_panel(&png(" "), Some(panel)).unwrap_err();
    assert!(matches!(err, FigureError::Asset(AssetError::Rejected(_))));
    let err = api.insert_file_after(&csv(""), None).unwrap_err();
    assert!(matches!(err, FigureError::Asset(AssetError::Rejected(_))));

    assert_eq!(api.document().version(), version);
    assert_eq!(root_list(&api, Property::Panels), panels);
    assert_eq!(root_list(&api, Property::Files), files);
    assert_eq!(api.selection(), selection);
}

#[test]
fn panel_after_sibling_clones_its_template() {
    let mut api = api();
    let first = api.insert_panel(&png("a.png"), None).unwrap();
    let last = api.insert_panel(&png("c.png"), None).unwrap();
    api.add_keyword_group(first, &json!({ "name": "Organism", "keywords": [] }))
        .unwrap();

    let middle = api.insert_panel(&png("b.png"), Some(first)).unwrap();

    assert_eq!(root_list(&api, Property::Panels), vec![first, middle, last]);
    let copy = api.document().template_of(middle).unwrap();
    assert_eq!(copy["keywords"][0]["name"], json!("Organism"));
    assert_ne!(image_src(&api, middle), image_src(&api, first));
    // the copy owns its own keyword group
    let groups = api.document().entity(middle).unwrap().list(Property::Keywords);
    let original = api.document().entity(first).unwrap().list(Property::Keywords);
    assert_ne!(groups, original);
}

#[test]
fn panel_after_unknown_sibling_registers_nothing() {
    let mut api = api();
    let ghost = EntityId::intern("panel_ghost");
    let err = api.insert_panel(&png("a.png"), Some(ghost)).unwrap_err();
    assert!(err.is_not_found());
    assert!(api.context().assets().is_empty());
    assert!(root_list(&api, Property::Panels).is_empty());
}

#[test]
fn replacing_image_twice_keeps_second_and_changes_no_structure() {
    let mut api = api();
    let panel = api.insert_panel(&png("a.png"), None).unwrap();

    let first = api.replace_panel_image(panel, &png("b.png")).unwrap();
    let set = api.document().last_change().unwrap().clone();
    assert_eq!(set.changes.len(), 1);
    assert!(set.changes[0].is_content());

    let second = api.replace_panel_image(panel, &png("c.png")).unwrap();
    let set = api.document().last_change().unwrap();
    assert_eq!(set.changes.len(), 1);
    assert!(set.changes.iter().all(|c| !c.is_structural()));

    assert_ne!(first, second);
    assert_eq!(image_src(&api, panel), second.as_str());
}

#[test]
fn replacing_with_identical_content_still_writes_once() {
    let mut api = api();
    let panel = api.insert_panel(&png("a.png"), None).unwrap();
    let first = api.replace_panel_image(panel, &png("b.png")).unwrap();
    let version = api.document().version();
    let second = api.replace_panel_image(panel, &png("b.png")).unwrap();
    assert_eq!(first, second);
    assert_eq!(api.document().version(), version + 1);
    assert_eq!(api.document().last_change().unwrap().changes.len(), 1);
}

#[test]
fn replace_image_of_non_panel_fails() {
    let mut api = api();
    let file = api.add_file(&csv("data.csv")).unwrap();
    let err = api.replace_panel_image(file, &png("a.png")).unwrap_err();
    assert!(matches!(err, FigureError::InvalidStructure(_)));
}

// ─── Files ───────────────────────────────────────────────────────────────

#[test]
fn files_insert_after_sibling() {
    let mut api = api();
    let a = api.add_file(&csv("a.csv")).unwrap();
    let c = api.add_file(&csv("c.csv")).unwrap();
    let b = api.insert_file_after(&csv("b.csv"), Some(a)).unwrap();

    assert_eq!(root_list(&api, Property::Files), vec![a, b, c]);
    let entity = api.document().entity(b).unwrap();
    assert_eq!(entity.text(Property::MimeType), Some("text/csv"));
    assert_eq!(entity.list(Property::Legend).len(), 1);
    assert_eq!(api.selection(), Selection::node(b));
}

#[test]
fn remote_file_keeps_its_url() {
    let mut api = api();
    let file = api
        .insert_remote_file("counts", "https://example.org/counts.csv", None, None)
        .unwrap();
    let entity = api.document().entity(file).unwrap();
    assert_eq!(entity.text(Property::Url), Some("https://example.org/counts.csv"));
    assert_eq!(entity.text(Property::MimeType), None);
    let src = AssetRef::new(entity.text(Property::Src).unwrap());
    let stored = api.context().assets().get_asset(&src).unwrap();
    assert_eq!(stored.url(), Some("https://example.org/counts.csv"));
}

#[test]
fn legend_size_follows_config() {
    let config = EditorConfig {
        legend_paragraphs: 2,
        ..EditorConfig::default()
    };
    let mut api = FigureApi::new(EditorSession::new(MemoryArchive::new(), config));
    let file = api.add_file(&csv("a.csv")).unwrap();
    assert_eq!(
        api.document().entity(file).unwrap().list(Property::Legend).len(),
        2
    );
}

#[test]
fn selection_stays_put_when_disabled() {
    let config = EditorConfig {
        select_inserted: false,
        ..EditorConfig::default()
    };
    let mut api = FigureApi::new(EditorSession::new(MemoryArchive::new(), config));
    api.add_file(&csv("a.csv")).unwrap();
    assert_eq!(api.selection(), Selection::None);
}

// ─── Resources ───────────────────────────────────────────────────────────

#[test]
fn resource_data_overrides_defaults() {
    let mut api = api();
    let plain = api.add_resource(&json!({ "title": "Code" })).unwrap();
    let bare = api
        .insert_resource_after(&json!({ "href": "https://example.org", "legend": [] }), Some(plain))
        .unwrap();

    assert_eq!(root_list(&api, Property::Resources), vec![plain, bare]);
    let doc = api.document();
    assert_eq!(doc.entity(plain).unwrap().list(Property::Legend).len(), 1);
    assert!(doc.entity(bare).unwrap().list(Property::Legend).is_empty());
    assert_eq!(
        doc.entity(bare).unwrap().text(Property::Href),
        Some("https://example.org")
    );
}

#[test]
fn resource_payload_of_wrong_type_is_malformed() {
    let mut api = api();
    let err = api.add_resource(&json!({ "type": "file" })).unwrap_err();
    assert!(matches!(err, FigureError::MalformedPayload(_)));
    assert!(root_list(&api, Property::Resources).is_empty());
}

// ─── Keyword groups ──────────────────────────────────────────────────────

#[test]
fn keyword_groups_insert_after_sibling_within_panel() {
    let mut api = api();
    let panel = api.insert_panel(&png("a.png"), None).unwrap();
    let first = api.add_keyword_group(panel, &json!({ "name": "A" })).unwrap();
    let third = api.add_keyword_group(panel, &json!({ "name": "C" })).unwrap();
    let second = api
        .insert_keyword_group_after(panel, &json!({ "name": "B" }), Some(first))
        .unwrap();
    let list = api.document().entity(panel).unwrap().list(Property::Keywords);
    assert_eq!(list, &[first, second, third]);
}

#[test]
fn keyword_group_sibling_must_belong_to_panel() {
    let mut api = api();
    let a = api.insert_panel(&png("a.png"), None).unwrap();
    let b = api.insert_panel(&png("b.png"), None).unwrap();
    let foreign = api.add_keyword_group(a, &json!({ "name": "A" })).unwrap();
    let err = api
        .insert_keyword_group_after(b, &json!({ "name": "B" }), Some(foreign))
        .unwrap_err();
    assert_eq!(
        err,
        FigureError::NotInList {
            id: foreign,
            path: ListPath::new(b, Property::Keywords),
        }
    );
}

// ─── Attachments ─────────────────────────────────────────────────────────

#[test]
fn attaching_selects_the_value() {
    let mut api = api();
    let panel = api.insert_panel(&png("a.png"), None).unwrap();
    let file = api.add_file(&csv("a.csv")).unwrap();
    let resource = api.add_resource(&json!({ "title": "Code" })).unwrap();

    assert_eq!(api.attach_file(panel, file).unwrap(), 0);
    assert_eq!(api.selection(), Selection::value(panel, Property::Files, file));

    api.attach_resource(panel, resource).unwrap();
    assert_eq!(
        api.selection(),
        Selection::value(panel, Property::Resources, resource)
    );
}

#[test]
fn attaching_twice_is_rejected_without_side_effects() {
    let mut api = api();
    let panel = api.insert_panel(&png("a.png"), None).unwrap();
    let file = api.add_file(&csv("a.csv")).unwrap();
    api.attach_file(panel, file).unwrap();
    api.select_node(panel).unwrap();

    let err = api.attach_file(panel, file).unwrap_err();
    assert!(matches!(err, FigureError::InvalidStructure(_)));
    assert_eq!(api.selection(), Selection::node(panel));
    assert_eq!(
        api.document().entity(panel).unwrap().list(Property::Files),
        &[file]
    );
}

#[test]
fn attaching_wrong_kind_is_rejected() {
    let mut api = api();
    let panel = api.insert_panel(&png("a.png"), None).unwrap();
    let resource = api.add_resource(&json!({})).unwrap();
    let err = api.attach_file(panel, resource).unwrap_err();
    assert!(matches!(err, FigureError::InvalidStructure(_)));
}

#[test]
fn set_panel_files_replaces_the_set() {
    let mut api = api();
    let panel = api.insert_panel(&png("a.png"), None).unwrap();
    let files: Vec<EntityId> = ["a.csv", "b.csv", "c.csv", "d.csv"]
        .iter()
        .map(|name| api.add_file(&csv(name)).unwrap())
        .collect();
    for file in &files[..3] {
        api.attach_file(panel, *file).unwrap();
    }

    api.set_panel_files(panel, &[files[3], files[2], files[0]])
        .unwrap();

    assert_eq!(
        api.document().entity(panel).unwrap().list(Property::Files),
        &[files[0], files[2], files[3]]
    );
    assert_eq!(api.selection(), Selection::node(panel));
}

#[test]
fn set_panel_files_is_atomic() {
    let mut api = api();
    let panel = api.insert_panel(&png("a.png"), None).unwrap();
    let file = api.add_file(&csv("a.csv")).unwrap();
    api.attach_file(panel, file).unwrap();
    let selection = api.selection();

    let ghost = EntityId::intern("file_ghost");
    let err = api.set_panel_files(panel, &[ghost]).unwrap_err();
    assert_eq!(err, FigureError::NotFound(ghost));
    assert_eq!(
        api.document().entity(panel).unwrap().list(Property::Files),
        &[file]
    );
    assert_eq!(api.selection(), selection);
}

// ─── Selection ───────────────────────────────────────────────────────────

#[test]
fn select_value_accepts_unattached_values() {
    let mut api = api();
    let panel = api.insert_panel(&png("a.png"), None).unwrap();
    let file = api.add_file(&csv("a.csv")).unwrap();

    api.select_value(panel, Property::Files, file).unwrap();
    assert_eq!(api.selection(), Selection::value(panel, Property::Files, file));
    assert!(api.document().entity(panel).unwrap().list(Property::Files).is_empty());

    let err = api.select_value(panel, Property::Title, file).unwrap_err();
    assert!(matches!(err, FigureError::InvalidStructure(_)));
    let err = api.select_value(panel, Property::Panels, file).unwrap_err();
    assert!(matches!(err, FigureError::UnknownProperty { .. }));
    let ghost = EntityId::intern("panel_ghost");
    assert!(api.select_value(ghost, Property::Files, file).unwrap_err().is_not_found());
    assert_eq!(api.selection(), Selection::value(panel, Property::Files, file));
}
