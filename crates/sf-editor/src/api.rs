//! The Smart Figure editing API.
//!
//! Each operation is one call into the positional accessor, the insertion
//! protocol or the reconciler, and commits (or rolls back) as a single
//! transaction.

use crate::config::EditorConfig;
use crate::context::EditorContext;
use crate::insert::{
    InsertTarget, default_legend, embed, insert_entity, merge_payload, tag_payload,
};
use crate::reconcile::{KeywordDraft, ReconcileStats, reconcile_keywords};
use serde::Deserialize;
use serde_json::{Value as Json, json};
use sf_core::{
    AssetRef, AssetSource, AssetStore, EntityId, EntityKind, FigureDocument, FigureError,
    FigureResult, FilePayload, ListPath, Property, Selection,
};

/// New state for a keyword group: optional new name plus the desired
/// keyword list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeywordGroupUpdate {
    pub name: Option<String>,
    pub keywords: Vec<KeywordDraft>,
}

/// Editing operations over a figure document.
pub struct FigureApi<C> {
    ctx: C,
}

impl<C: EditorContext> FigureApi<C> {
    pub fn new(ctx: C) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    pub fn into_context(self) -> C {
        self.ctx
    }

    pub fn document(&self) -> &FigureDocument {
        self.ctx.document()
    }

    pub fn config(&self) -> &EditorConfig {
        self.ctx.config()
    }

    pub fn selection(&self) -> Selection {
        *self.ctx.document().selection()
    }

    /// The selected entity if it is of `kind`.
    pub fn selected(&self, kind: EntityKind) -> Option<EntityId> {
        let id = self.selection().node_id()?;
        let entity = self.document().get(id)?;
        (entity.kind == kind).then_some(id)
    }

    fn root_list(&self, property: Property) -> ListPath {
        ListPath::new(self.document().root_id(), property)
    }

    fn legend(&self) -> Json {
        default_legend(self.config().legend_paragraphs)
    }

    fn expect_kind(&self, id: EntityId, kind: EntityKind) -> FigureResult<()> {
        let actual = self.document().entity(id)?.kind;
        if actual != kind {
            return Err(FigureError::InvalidStructure(format!(
                "{id} is a {actual}, not a {kind}"
            )));
        }
        Ok(())
    }

    // ─── Panels ──────────────────────────────────────────────────────────

    /// Insert a panel showing `image`, after `after` or at the end.
    ///
    /// Inserting after a sibling copies the sibling's template; only the
    /// image reference and MIME type are replaced.
    pub fn insert_panel(
        &mut self,
        image: &FilePayload,
        after: Option<EntityId>,
    ) -> FigureResult<EntityId> {
        let path = self.root_list(Property::Panels);
        let target = InsertTarget::resolve(self.document(), path, after)?;
        let mut template = match after {
            Some(sibling) => self.document().template_of(sibling)?,
            None => json!({
                "type": "panel",
                "image": { "type": "image" },
                "legend": self.legend(),
            }),
        };

        let asset = self
            .ctx
            .assets_mut()
            .add_asset(&AssetSource::Upload(image.clone()))?;
        embed(&mut template, "/image", "src", asset.as_str())?;
        embed(&mut template, "/image", "mimeType", image.mime_type.as_str())?;

        insert_entity(&mut self.ctx, target, &template)
    }

    /// Point a panel's image at new content. Content-only: the document
    /// structure is untouched and exactly one attribute write is committed.
    pub fn replace_panel_image(
        &mut self,
        panel: EntityId,
        image: &FilePayload,
    ) -> FigureResult<AssetRef> {
        self.expect_kind(panel, EntityKind::Panel)?;
        let image_id = self
            .document()
            .entity(panel)?
            .child(Property::Image)
            .ok_or_else(|| FigureError::InvalidStructure(format!("{panel} has no image")))?;
        let previous = self
            .document()
            .entity(image_id)?
            .text(Property::Src)
            .map(AssetRef::new)
            .filter(|old| self.ctx.assets().get_asset(old).is_some());

        let asset = match previous {
            Some(old) => self.ctx.assets_mut().replace_asset(&old, image)?,
            None => self
                .ctx
                .assets_mut()
                .add_asset(&AssetSource::Upload(image.clone()))?,
        };
        self.ctx
            .transaction(|tx| tx.set(image_id, Property::Src, asset.as_str()))?;
        log::debug!("replace image of {panel}: {asset}");
        Ok(asset)
    }

    // ─── Files ───────────────────────────────────────────────────────────

    pub fn add_file(&mut self, file: &FilePayload) -> FigureResult<EntityId> {
        self.insert_file_after(file, None)
    }

    /// Register `file` with the asset store and insert a file entity for it.
    pub fn insert_file_after(
        &mut self,
        file: &FilePayload,
        after: Option<EntityId>,
    ) -> FigureResult<EntityId> {
        let path = self.root_list(Property::Files);
        let target = InsertTarget::resolve(self.document(), path, after)?;
        let asset = self
            .ctx
            .assets_mut()
            .add_asset(&AssetSource::Upload(file.clone()))?;
        let payload = json!({
            "type": "file",
            "src": asset.as_str(),
            "mimeType": file.mime_type,
            "legend": self.legend(),
        });
        insert_entity(&mut self.ctx, target, &payload)
    }

    /// Insert a file that stays remote. Only its descriptor is registered.
    pub fn insert_remote_file(
        &mut self,
        name: &str,
        url: &str,
        mime_type: Option<&str>,
        after: Option<EntityId>,
    ) -> FigureResult<EntityId> {
        let path = self.root_list(Property::Files);
        let target = InsertTarget::resolve(self.document(), path, after)?;
        let source = AssetSource::Remote {
            name: name.to_string(),
            url: url.to_string(),
            mime_type: mime_type.map(str::to_string),
        };
        let asset = self.ctx.assets_mut().add_asset(&source)?;
        let payload = json!({
            "type": "file",
            "title": name,
            "src": asset.as_str(),
            "url": url,
            "mimeType": mime_type,
            "legend": self.legend(),
        });
        insert_entity(&mut self.ctx, target, &payload)
    }

    // ─── Keyword groups ──────────────────────────────────────────────────

    pub fn add_keyword_group(&mut self, panel: EntityId, data: &Json) -> FigureResult<EntityId> {
        self.insert_keyword_group_after(panel, data, None)
    }

    /// Insert a keyword group built from `data` into `panel`.
    pub fn insert_keyword_group_after(
        &mut self,
        panel: EntityId,
        data: &Json,
        after: Option<EntityId>,
    ) -> FigureResult<EntityId> {
        self.expect_kind(panel, EntityKind::Panel)?;
        let path = ListPath::new(panel, Property::Keywords);
        let target = InsertTarget::resolve(self.document(), path, after)?;
        let payload = tag_payload(data, EntityKind::KeywordGroup)?;
        insert_entity(&mut self.ctx, target, &payload)
    }

    /// Bring a keyword group in line with `update` in one transaction.
    pub fn update_keyword_group(
        &mut self,
        group: EntityId,
        update: &KeywordGroupUpdate,
    ) -> FigureResult<ReconcileStats> {
        self.ctx.transaction(|tx| {
            let stats = reconcile_keywords(tx, group, &update.keywords)?;
            if let Some(name) = &update.name {
                tx.set(group, Property::Name, name.as_str())?;
            }
            Ok(stats)
        })
    }

    // ─── Resources ───────────────────────────────────────────────────────

    pub fn add_resource(&mut self, data: &Json) -> FigureResult<EntityId> {
        self.insert_resource_after(data, None)
    }

    /// Insert a resource. `data` is merged over a default resource with an
    /// empty legend.
    pub fn insert_resource_after(
        &mut self,
        data: &Json,
        after: Option<EntityId>,
    ) -> FigureResult<EntityId> {
        let path = self.root_list(Property::Resources);
        let target = InsertTarget::resolve(self.document(), path, after)?;
        let defaults = json!({ "type": "resource", "legend": self.legend() });
        let payload = tag_payload(&merge_payload(defaults, data)?, EntityKind::Resource)?;
        insert_entity(&mut self.ctx, target, &payload)
    }

    // ─── Attachments ─────────────────────────────────────────────────────

    /// Append `file` to the panel's attached files and select it there.
    pub fn attach_file(&mut self, panel: EntityId, file: EntityId) -> FigureResult<usize> {
        self.attach(panel, Property::Files, file)
    }

    /// Append `resource` to the panel's attached resources and select it there.
    pub fn attach_resource(&mut self, panel: EntityId, resource: EntityId) -> FigureResult<usize> {
        self.attach(panel, Property::Resources, resource)
    }

    fn attach(
        &mut self,
        panel: EntityId,
        property: Property,
        value: EntityId,
    ) -> FigureResult<usize> {
        self.expect_kind(panel, EntityKind::Panel)?;
        let path = ListPath::new(panel, property);
        self.ctx.transaction(|tx| {
            let index = tx.append(&path, value)?;
            tx.set_selection(Selection::value(panel, property, value));
            Ok(index)
        })
    }

    /// Make the panel's attached files exactly `files`.
    ///
    /// Files already attached keep their position; newly attached ones are
    /// appended in the order given.
    pub fn set_panel_files(&mut self, panel: EntityId, files: &[EntityId]) -> FigureResult<()> {
        self.expect_kind(panel, EntityKind::Panel)?;
        let path = ListPath::new(panel, Property::Files);
        self.ctx.transaction(|tx| {
            let current = tx.document().list(&path)?.to_vec();
            for (index, id) in current.iter().enumerate().rev() {
                if !files.contains(id) {
                    tx.remove_at(&path, index)?;
                }
            }
            for id in files {
                if !tx.document().list(&path)?.contains(id) {
                    tx.append(&path, *id)?;
                }
            }
            tx.set_selection(Selection::node(panel));
            Ok(())
        })
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select one value of a many-valued property.
    ///
    /// `value` need not be a current member of the list, so the UI can point
    /// at a value it is about to attach.
    pub fn select_value(
        &mut self,
        node: EntityId,
        property: Property,
        value: EntityId,
    ) -> FigureResult<()> {
        self.document().list_type(&ListPath::new(node, property))?;
        self.ctx.transaction(|tx| {
            tx.set_selection(Selection::value(node, property, value));
            Ok(())
        })
    }

    pub fn select_node(&mut self, node: EntityId) -> FigureResult<()> {
        self.document().entity(node)?;
        self.ctx.transaction(|tx| {
            tx.set_selection(Selection::node(node));
            Ok(())
        })
    }
}
