//! Entity Insertion Protocol.
//!
//! Every "add a child" operation follows the same recipe:
//!
//! 1. Fix the target list for the kind being inserted.
//! 2. Resolve the insertion index: append, or directly after a sibling.
//! 3. Register any binary with the asset store and embed the returned
//!    reference in the payload. This happens before the transaction opens.
//! 4. In one transaction: materialize the payload, insert its id at the
//!    index, and move the selection to the new entity.
//!
//! A malformed payload aborts step 4 as a whole. An asset registered in step
//! 3 is left orphaned in that case.

use crate::context::EditorContext;
use serde_json::{Map, Value as Json, json};
use sf_core::{
    EntityId, EntityKind, FigureDocument, FigureError, FigureResult, ListPath, Selection,
    resolve_insert_index,
};

/// Where a new entity will land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertTarget {
    pub path: ListPath,
    pub index: usize,
}

impl InsertTarget {
    /// Resolve the slot after `after`, or the end of the list.
    pub fn resolve(
        doc: &FigureDocument,
        path: ListPath,
        after: Option<EntityId>,
    ) -> FigureResult<Self> {
        let index = resolve_insert_index(doc, &path, after)?;
        Ok(Self { path, index })
    }
}

/// Materialize `payload` and insert it at `target` in one transaction.
pub fn insert_entity<C: EditorContext>(
    ctx: &mut C,
    target: InsertTarget,
    payload: &Json,
) -> FigureResult<EntityId> {
    let select = ctx.config().select_inserted;
    let id = ctx.transaction(|tx| {
        let id = tx.create_from_json(payload)?;
        tx.insert_at(&target.path, target.index, id)?;
        if select {
            tx.set_selection(Selection::node(id));
        }
        Ok(id)
    })?;
    log::debug!("insert: {id} at {}[{}]", target.path, target.index);
    Ok(id)
}

/// Require `payload` to be an object of `kind`, filling in a missing `type`.
pub fn tag_payload(payload: &Json, kind: EntityKind) -> FigureResult<Json> {
    let mut obj = payload.as_object().cloned().ok_or_else(|| {
        FigureError::MalformedPayload(format!("expected an object, got {payload}"))
    })?;
    match obj.get("type").and_then(Json::as_str) {
        None => {
            obj.insert("type".into(), Json::from(kind.as_str()));
        }
        Some(tag) if tag == kind.as_str() => {}
        Some(tag) => {
            return Err(FigureError::MalformedPayload(format!(
                "expected a {kind} payload, got `{tag}`"
            )));
        }
    }
    Ok(Json::Object(obj))
}

/// Shallow merge: keys of `overrides` replace those of `defaults`.
pub fn merge_payload(defaults: Json, overrides: &Json) -> FigureResult<Json> {
    let mut merged: Map<String, Json> = match defaults {
        Json::Object(obj) => obj,
        other => {
            return Err(FigureError::MalformedPayload(format!(
                "expected an object, got {other}"
            )));
        }
    };
    let overrides = overrides.as_object().ok_or_else(|| {
        FigureError::MalformedPayload(format!("expected an object, got {overrides}"))
    })?;
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    Ok(Json::Object(merged))
}

/// Set `key` on the object found at JSON pointer `pointer` inside `payload`.
pub fn embed(
    payload: &mut Json,
    pointer: &str,
    key: &str,
    value: impl Into<Json>,
) -> FigureResult<()> {
    let slot = payload
        .pointer_mut(pointer)
        .and_then(Json::as_object_mut)
        .ok_or_else(|| {
            FigureError::MalformedPayload(format!("payload has no object at `{pointer}`"))
        })?;
    slot.insert(key.to_string(), value.into());
    Ok(())
}

/// A legend of `paragraphs` empty paragraphs.
pub fn default_legend(paragraphs: usize) -> Json {
    Json::Array((0..paragraphs).map(|_| json!({ "type": "paragraph" })).collect())
}
