//! WASM bridge for Smart Figure: exposes the editing API to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. Every mutating call returns
//! a JSON string: `{"ok":true,...}` on success or
//! `{"ok":false,"kind":"...","error":"..."}` on failure. An empty `after`
//! argument means "append".

use serde::Serialize;
use serde_json::{Map, Value as Json};
use sf_core::{
    AssetRef, AssetSource, AssetStore, EntityId, FigureDocument, FigureError, FigureResult,
    FilePayload, MemoryArchive, Property,
};
use sf_editor::{EditorConfig, EditorContext, EditorSession, FigureApi, KeywordGroupUpdate};
use wasm_bindgen::prelude::*;

/// Browser-facing figure editor.
///
/// Owns one editing session with an in-memory asset archive. All calls from
/// the host page go through this struct.
#[wasm_bindgen]
pub struct FigureEditor {
    api: FigureApi<EditorSession<MemoryArchive>>,
}

#[wasm_bindgen]
impl FigureEditor {
    /// Create an editor on an empty figure. `config` is an `EditorConfig`
    /// JSON object; an empty or invalid string falls back to defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: &str) -> Self {
        console_error_panic_hook_setup();

        let config = if config.trim().is_empty() {
            EditorConfig::default()
        } else {
            EditorConfig::from_json(config).unwrap_or_else(|e| {
                log::warn!("invalid editor config, using defaults: {e}");
                EditorConfig::default()
            })
        };
        let session = EditorSession::new(MemoryArchive::new(), config);
        Self {
            api: FigureApi::new(session),
        }
    }

    // ─── Panels ──────────────────────────────────────────────────────────

    pub fn insert_panel(
        &mut self,
        name: &str,
        mime_type: &str,
        data: Vec<u8>,
        after: &str,
    ) -> String {
        let image = FilePayload::new(name, mime_type, data);
        respond("id", self.api.insert_panel(&image, optional_id(after)))
    }

    pub fn replace_panel_image(
        &mut self,
        panel: &str,
        name: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> String {
        let image = FilePayload::new(name, mime_type, data);
        respond(
            "asset",
            self.api.replace_panel_image(EntityId::intern(panel), &image),
        )
    }

    // ─── Files ───────────────────────────────────────────────────────────

    pub fn add_file(&mut self, name: &str, mime_type: &str, data: Vec<u8>) -> String {
        self.insert_file_after(name, mime_type, data, "")
    }

    pub fn insert_file_after(
        &mut self,
        name: &str,
        mime_type: &str,
        data: Vec<u8>,
        after: &str,
    ) -> String {
        let file = FilePayload::new(name, mime_type, data);
        respond("id", self.api.insert_file_after(&file, optional_id(after)))
    }

    /// Insert a file that stays at `url`. An empty `mime_type` is omitted.
    pub fn insert_remote_file(
        &mut self,
        name: &str,
        url: &str,
        mime_type: &str,
        after: &str,
    ) -> String {
        let mime_type = (!mime_type.is_empty()).then_some(mime_type);
        respond(
            "id",
            self.api
                .insert_remote_file(name, url, mime_type, optional_id(after)),
        )
    }

    // ─── Keyword groups ──────────────────────────────────────────────────

    pub fn add_keyword_group(&mut self, panel: &str, data: &str) -> String {
        self.insert_keyword_group_after(panel, data, "")
    }

    pub fn insert_keyword_group_after(&mut self, panel: &str, data: &str, after: &str) -> String {
        let result = parse_json(data).and_then(|data| {
            self.api
                .insert_keyword_group_after(EntityId::intern(panel), &data, optional_id(after))
        });
        respond("id", result)
    }

    /// Reconcile a keyword group with `{"name"?: "...", "keywords": [{"id"?, "content"}]}`.
    pub fn update_keyword_group(&mut self, group: &str, data: &str) -> String {
        let result = serde_json::from_str::<KeywordGroupUpdate>(data)
            .map_err(|e| FigureError::MalformedPayload(e.to_string()))
            .and_then(|update| self.api.update_keyword_group(EntityId::intern(group), &update));
        respond("stats", result)
    }

    // ─── Resources ───────────────────────────────────────────────────────

    pub fn add_resource(&mut self, data: &str) -> String {
        self.insert_resource_after(data, "")
    }

    pub fn insert_resource_after(&mut self, data: &str, after: &str) -> String {
        let result = parse_json(data)
            .and_then(|data| self.api.insert_resource_after(&data, optional_id(after)));
        respond("id", result)
    }

    // ─── Attachments ─────────────────────────────────────────────────────

    pub fn attach_file(&mut self, panel: &str, file: &str) -> String {
        respond(
            "index",
            self.api
                .attach_file(EntityId::intern(panel), EntityId::intern(file)),
        )
    }

    pub fn attach_resource(&mut self, panel: &str, resource: &str) -> String {
        respond(
            "index",
            self.api
                .attach_resource(EntityId::intern(panel), EntityId::intern(resource)),
        )
    }

    /// Replace a panel's attached files with a JSON array of file ids.
    pub fn set_panel_files(&mut self, panel: &str, files: &str) -> String {
        let result = serde_json::from_str::<Vec<EntityId>>(files)
            .map_err(|e| FigureError::MalformedPayload(e.to_string()))
            .and_then(|files| self.api.set_panel_files(EntityId::intern(panel), &files));
        respond_ok(result)
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select_value(&mut self, node: &str, property: &str, value: &str) -> String {
        let result = Property::parse(property)
            .ok_or_else(|| FigureError::MalformedPayload(format!("unknown property `{property}`")))
            .and_then(|property| {
                self.api
                    .select_value(EntityId::intern(node), property, EntityId::intern(value))
            });
        respond_ok(result)
    }

    pub fn select_node(&mut self, node: &str) -> String {
        respond_ok(self.api.select_node(EntityId::intern(node)))
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// The whole document as nested JSON, ids included.
    pub fn get_document_json(&self) -> String {
        let doc = self.api.document();
        to_json_string(doc.to_json(doc.root_id()))
    }

    /// One entity subtree as JSON, or `null` if it does not exist.
    pub fn get_entity_json(&self, id: &str) -> String {
        to_json_string(self.api.document().to_json(EntityId::intern(id)))
    }

    /// Template of an entity (no ids), as used when cloning siblings.
    pub fn get_template_json(&self, id: &str) -> String {
        to_json_string(self.api.document().template_of(EntityId::intern(id)))
    }

    pub fn get_selection_json(&self) -> String {
        serde_json::to_string(&self.api.selection()).unwrap_or_else(|_| "null".to_string())
    }

    /// Descriptor of a stored asset: `{"name","mimeType","url","bytes"}` or `null`.
    pub fn get_asset_json(&self, asset: &str) -> String {
        let assets = self.api.context().assets();
        let Some(source) = assets.get_asset(&AssetRef::new(asset)) else {
            return "null".to_string();
        };
        let bytes = match source {
            AssetSource::Upload(file) => Some(file.data.len()),
            AssetSource::Remote { .. } => None,
        };
        serde_json::json!({
            "name": source.name(),
            "mimeType": source.mime_type(),
            "url": source.url(),
            "bytes": bytes,
        })
        .to_string()
    }

    /// Counts of the most recent committed transaction, or `null`.
    pub fn get_last_change_json(&self) -> String {
        match self.api.document().last_change() {
            Some(set) => serde_json::to_string(&set.summary()).unwrap_or_else(|_| "null".into()),
            None => "null".to_string(),
        }
    }

    pub fn version(&self) -> u64 {
        self.api.document().version()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn optional_id(id: &str) -> Option<EntityId> {
    (!id.is_empty()).then(|| EntityId::intern(id))
}

fn parse_json(text: &str) -> FigureResult<Json> {
    serde_json::from_str(text).map_err(|e| FigureError::MalformedPayload(e.to_string()))
}

fn error_kind(error: &FigureError) -> &'static str {
    match error {
        FigureError::NotFound(_) | FigureError::NotInList { .. } => "notFound",
        FigureError::IndexOutOfRange { .. } => "indexOutOfRange",
        FigureError::MalformedPayload(_) => "malformedPayload",
        FigureError::InvalidStructure(_) => "invalidStructure",
        FigureError::UnknownProperty { .. } => "unknownProperty",
        FigureError::Asset(_) => "asset",
    }
}

fn respond<T: Serialize>(key: &str, result: FigureResult<T>) -> String {
    let mut obj = Map::new();
    match result {
        Ok(value) => {
            obj.insert("ok".into(), Json::Bool(true));
            obj.insert(
                key.into(),
                serde_json::to_value(value).unwrap_or(Json::Null),
            );
        }
        Err(e) => {
            obj.insert("ok".into(), Json::Bool(false));
            obj.insert("kind".into(), Json::from(error_kind(&e)));
            obj.insert("error".into(), Json::from(e.to_string()));
        }
    }
    Json::Object(obj).to_string()
}

fn respond_ok(result: FigureResult<()>) -> String {
    match result {
        Ok(()) => r#"{"ok":true}"#.to_string(),
        Err(e) => respond::<()>("", Err(e)),
    }
}

fn to_json_string(result: FigureResult<Json>) -> String {
    result
        .map(|json| json.to_string())
        .unwrap_or_else(|_| "null".to_string())
}

/// Set up a panic hook that logs to the browser console.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Smart Figure WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone validation (no editor needed) ────────────────────────────

/// Check that a payload materializes on an empty document. Returns
/// `{"ok":true,"entity":{...}}` or `{"ok":false,...}`. Payloads referencing
/// existing entities fail here by construction.
#[wasm_bindgen]
pub fn validate_payload(payload: &str) -> String {
    let result = parse_json(payload).and_then(|payload| {
        let (doc, id) = scratch_document(&payload)?;
        doc.template_of(id)
    });
    respond("entity", result)
}

/// Materialize `payload` into a throwaway document and commit it there.
fn scratch_document(payload: &Json) -> FigureResult<(FigureDocument, EntityId)> {
    let mut doc = FigureDocument::new();
    let id = doc.transaction(|tx| tx.create_from_json(payload))?;
    Ok((doc, id))
}
