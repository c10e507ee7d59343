//! Sequence Reconciler for keyword groups.
//!
//! Transforms the stored keyword list of a group into a desired list with a
//! single forward pass over both sequences. Keywords whose id survives keep
//! their identity (and only get their content rewritten when it differs);
//! drafts without a known id become new keywords; stored keywords that no
//! draft mentions are removed and deep-deleted.
//!
//! Retained keywords are expected to keep their relative order. Reordered
//! input still yields the requested sequence, at the cost of extra
//! insert/delete pairs: a keyword that moved forward is recreated with a
//! fresh id.

use serde::{Deserialize, Serialize};
use sf_core::{
    Entity, EntityId, EntityKind, FigureError, FigureResult, ListPath, Property, Transaction,
};
use std::collections::HashSet;

/// One desired keyword: an existing id with possibly new content, or a new
/// keyword when `id` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordDraft {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub content: String,
}

impl KeywordDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
        }
    }

    pub fn existing(id: EntityId, content: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            content: content.into(),
        }
    }
}

/// What a reconciliation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub inserted: usize,
    pub removed: usize,
    pub updated: usize,
    pub kept: usize,
}

impl ReconcileStats {
    /// Inserts plus removals.
    pub fn structural(&self) -> usize {
        self.inserted + self.removed
    }
}

/// Reconcile the `keywords` list of `group` against `drafts` inside `tx`.
pub fn reconcile_keywords(
    tx: &mut Transaction<'_>,
    group: EntityId,
    drafts: &[KeywordDraft],
) -> FigureResult<ReconcileStats> {
    let kind = tx.entity(group)?.kind;
    if kind != EntityKind::KeywordGroup {
        return Err(FigureError::InvalidStructure(format!(
            "{group} is a {kind}, not a keyword group"
        )));
    }
    let path = ListPath::new(group, Property::Keywords);
    let old: Vec<EntityId> = tx.document().list(&path)?.to_vec();
    let wanted: HashSet<EntityId> = drafts.iter().filter_map(|draft| draft.id).collect();

    let mut stats = ReconcileStats::default();
    let (mut i, mut j, mut t) = (0, 0, 0);
    while i < old.len() || j < drafts.len() {
        if i >= old.len() {
            insert_fresh(tx, &path, t, &drafts[j])?;
            stats.inserted += 1;
            j += 1;
            t += 1;
        } else if j >= drafts.len() || !wanted.contains(&old[i]) {
            tx.remove_at(&path, t)?;
            tx.deep_delete(old[i])?;
            stats.removed += 1;
            i += 1;
        } else if drafts[j].id == Some(old[i]) {
            let current = tx.entity(old[i])?.text(Property::Content).unwrap_or_default();
            if current != drafts[j].content {
                tx.set(old[i], Property::Content, drafts[j].content.clone())?;
                stats.updated += 1;
            } else {
                stats.kept += 1;
            }
            i += 1;
            j += 1;
            t += 1;
        } else {
            insert_fresh(tx, &path, t, &drafts[j])?;
            stats.inserted += 1;
            j += 1;
            t += 1;
        }
    }

    log::debug!(
        "reconcile {group}: {} inserted, {} removed, {} updated, {} kept",
        stats.inserted,
        stats.removed,
        stats.updated,
        stats.kept
    );
    Ok(stats)
}

/// Create a keyword from `draft` under a new id and insert it at `index`.
fn insert_fresh(
    tx: &mut Transaction<'_>,
    path: &ListPath,
    index: usize,
    draft: &KeywordDraft,
) -> FigureResult<EntityId> {
    let id = tx.document().fresh_id(EntityKind::Keyword);
    let keyword =
        Entity::new(id, EntityKind::Keyword).with_text(Property::Content, draft.content.clone());
    tx.create(keyword)?;
    tx.insert_at(path, index, id)?;
    Ok(id)
}
