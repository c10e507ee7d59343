//! Transactions: journaled mutation with commit-or-rollback.
//!
//! Every mutating primitive records a [`Change`] holding enough state to undo
//! it. `commit` publishes the journal as a [`ChangeSet`]; dropping the
//! transaction without committing applies the inverses in reverse order, so
//! a failed operation leaves the document exactly as it found it.

use crate::accessor::ListPath;
use crate::error::{FigureError, FigureResult};
use crate::id::EntityId;
use crate::model::{Entity, FigureDocument, Value};
use crate::schema::{EntityKind, Property, PropertyType};
use crate::selection::Selection;
use serde::Serialize;

/// One recorded mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Create {
        id: EntityId,
        kind: EntityKind,
    },
    Set {
        id: EntityId,
        property: Property,
        before: Option<String>,
        after: Option<String>,
    },
    Insert {
        path: ListPath,
        index: usize,
        id: EntityId,
    },
    Remove {
        path: ListPath,
        index: usize,
        id: EntityId,
    },
    /// Full snapshot of a deleted entity and where it hung.
    Delete {
        entity: Box<Entity>,
        parent: Option<(EntityId, Property)>,
    },
    Select {
        before: Selection,
        after: Selection,
    },
}

impl Change {
    /// Inserts and removals of list members.
    pub fn is_structural(&self) -> bool {
        matches!(self, Change::Insert { .. } | Change::Remove { .. })
    }

    /// Attribute writes.
    pub fn is_content(&self) -> bool {
        matches!(self, Change::Set { .. })
    }
}

/// A committed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub version: u64,
    pub changes: Vec<Change>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary {
            version: self.version,
            ..ChangeSummary::default()
        };
        for change in &self.changes {
            match change {
                Change::Create { .. } => summary.creates += 1,
                Change::Set { .. } => summary.sets += 1,
                Change::Insert { .. } => summary.inserts += 1,
                Change::Remove { .. } => summary.removes += 1,
                Change::Delete { .. } => summary.deletes += 1,
                Change::Select { .. } => summary.selections += 1,
            }
        }
        summary
    }

    /// Ids of entities inserted into `path`, in journal order.
    pub fn inserted_into(&self, path: &ListPath) -> Vec<EntityId> {
        self.changes
            .iter()
            .filter_map(|change| match change {
                Change::Insert { path: p, id, .. } if p == path => Some(*id),
                _ => None,
            })
            .collect()
    }
}

/// Per-kind counts of a change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub version: u64,
    pub creates: usize,
    pub sets: usize,
    pub inserts: usize,
    pub removes: usize,
    pub deletes: usize,
    pub selections: usize,
}

/// An open transaction over a document.
pub struct Transaction<'a> {
    doc: &'a mut FigureDocument,
    journal: Vec<Change>,
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(doc: &'a mut FigureDocument) -> Self {
        Self {
            doc,
            journal: Vec::new(),
            committed: false,
        }
    }

    /// Read view of the document, including this transaction's changes.
    pub fn document(&self) -> &FigureDocument {
        self.doc
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.doc.get(id)
    }

    pub fn entity(&self, id: EntityId) -> FigureResult<&Entity> {
        self.doc.entity(id)
    }

    /// Changes recorded so far.
    pub fn changes(&self) -> &[Change] {
        &self.journal
    }

    // ─── Create ──────────────────────────────────────────────────────────

    /// Add a detached entity.
    ///
    /// Owned children it names must already exist and be unowned; they become
    /// its children. References must name existing entities of accepted
    /// kinds. Any violation is reported as `MalformedPayload`.
    pub fn create(&mut self, entity: Entity) -> FigureResult<EntityId> {
        let id = entity.id;
        let kind = entity.kind;
        if kind == EntityKind::Document {
            return Err(malformed(format!("cannot create another {kind}")));
        }
        if self.doc.contains(id) {
            return Err(malformed(format!("duplicate id `{id}`")));
        }

        for (property, value) in entity.properties() {
            let spec = kind
                .spec(property)
                .ok_or_else(|| malformed(format!("{kind} has no property `{property}`")))?;
            match (spec.ty, value) {
                (PropertyType::Text, Value::Text(_)) => {}
                (PropertyType::Child(_), Value::Id(child)) => {
                    self.validate_member(spec.ty, id, property, *child)?;
                }
                (PropertyType::Children(_) | PropertyType::References(_), Value::List(ids)) => {
                    for (n, child) in ids.iter().enumerate() {
                        if ids[..n].contains(child) {
                            return Err(malformed(format!("{id}.{property} lists {child} twice")));
                        }
                        self.validate_member(spec.ty, id, property, *child)?;
                    }
                }
                _ => {
                    return Err(malformed(format!(
                        "{kind}.{property} has the wrong value shape"
                    )));
                }
            }
        }
        if let Some(spec) = kind
            .schema()
            .iter()
            .find(|spec| spec.required && entity.get(spec.property).is_none())
        {
            return Err(malformed(format!("{kind} requires `{}`", spec.property)));
        }

        self.doc.raw_add(entity, None);
        log::trace!("tx: create {id} ({kind})");
        self.journal.push(Change::Create { id, kind });
        Ok(id)
    }

    fn validate_member(
        &self,
        ty: PropertyType,
        owner: EntityId,
        property: Property,
        child: EntityId,
    ) -> FigureResult<()> {
        let member = self
            .doc
            .get(child)
            .ok_or_else(|| malformed(format!("{owner}.{property} names unknown entity {child}")))?;
        if !ty.accepts(member.kind) {
            return Err(malformed(format!(
                "{owner}.{property} cannot hold {child} ({})",
                member.kind
            )));
        }
        if ty.owns()
            && let Some((parent, _)) = self.doc.parent_of(child)
        {
            return Err(malformed(format!("{child} is already owned by {parent}")));
        }
        Ok(())
    }

    // ─── Attributes ──────────────────────────────────────────────────────

    /// Write a text attribute. The write is recorded even when the value is
    /// unchanged, so observers see every explicit update.
    pub fn set(
        &mut self,
        id: EntityId,
        property: Property,
        text: impl Into<String>,
    ) -> FigureResult<()> {
        self.set_text(id, property, Some(text.into()))
    }

    /// Remove a text attribute.
    pub fn unset(&mut self, id: EntityId, property: Property) -> FigureResult<()> {
        self.set_text(id, property, None)
    }

    fn set_text(
        &mut self,
        id: EntityId,
        property: Property,
        after: Option<String>,
    ) -> FigureResult<()> {
        let kind = self.doc.entity(id)?.kind;
        let spec = kind
            .spec(property)
            .ok_or(FigureError::UnknownProperty { kind, property })?;
        if spec.ty != PropertyType::Text {
            return Err(FigureError::InvalidStructure(format!(
                "{id}.{property} is not a text attribute"
            )));
        }
        let before = self.doc.raw_set_text(id, property, after.clone())?;
        log::trace!("tx: set {id}.{property}");
        self.journal.push(Change::Set {
            id,
            property,
            before,
            after,
        });
        Ok(())
    }

    // ─── Lists ───────────────────────────────────────────────────────────

    /// Insert `id` at `index` of the list at `path`; `index == len` appends.
    ///
    /// Owned lists take ownership of `id`, which must be unowned. Lists never
    /// hold the same id twice.
    pub fn insert_at(&mut self, path: &ListPath, index: usize, id: EntityId) -> FigureResult<()> {
        let ty = self.doc.list_type(path)?;
        let list = self.doc.list(path)?;
        if index > list.len() {
            return Err(FigureError::IndexOutOfRange {
                path: *path,
                index,
                len: list.len(),
            });
        }
        if list.contains(&id) {
            return Err(FigureError::InvalidStructure(format!(
                "{id} is already in {path}"
            )));
        }
        let kind = self.doc.entity(id)?.kind;
        if !ty.accepts(kind) {
            return Err(FigureError::InvalidStructure(format!(
                "{path} cannot hold {id} ({kind})"
            )));
        }
        if ty.owns()
            && let Some((parent, property)) = self.doc.parent_of(id)
        {
            return Err(FigureError::InvalidStructure(format!(
                "{id} is already owned by {parent}.{property}"
            )));
        }

        self.doc.raw_insert(path, index, id)?;
        log::trace!("tx: insert {id} at {path}[{index}]");
        self.journal.push(Change::Insert {
            path: *path,
            index,
            id,
        });
        Ok(())
    }

    /// Append `id` to the list at `path`, returning its index.
    pub fn append(&mut self, path: &ListPath, id: EntityId) -> FigureResult<usize> {
        let index = self.doc.list(path)?.len();
        self.insert_at(path, index, id)?;
        Ok(index)
    }

    /// Remove the member at `index`. The entity itself stays in the document.
    pub fn remove_at(&mut self, path: &ListPath, index: usize) -> FigureResult<EntityId> {
        let id = self.doc.raw_remove_at(path, index)?;
        log::trace!("tx: remove {id} from {path}[{index}]");
        self.journal.push(Change::Remove {
            path: *path,
            index,
            id,
        });
        Ok(id)
    }

    /// Detach `id` from its parent and delete it with everything it owns.
    ///
    /// Reference lists pointing into the deleted subtree are cleaned up and a
    /// selection mentioning a deleted entity is cleared.
    pub fn deep_delete(&mut self, id: EntityId) -> FigureResult<()> {
        if id == self.doc.root_id() {
            return Err(FigureError::InvalidStructure(
                "the document root cannot be deleted".to_string(),
            ));
        }
        self.doc.entity(id)?;

        if let Some((owner, property)) = self.doc.parent_of(id) {
            let path = ListPath::new(owner, property);
            if self.doc.list_type(&path).is_err() {
                return Err(FigureError::InvalidStructure(format!(
                    "{id} is the required {property} of {owner}"
                )));
            }
            let index = crate::accessor::index_of(self.doc, &path, id)?;
            self.remove_at(&path, index)?;
        }

        let doomed = self.doc.subtree_post_order(id)?;
        for target in &doomed {
            while let Some((path, index)) = self.doc.find_reference(*target) {
                self.remove_at(&path, index)?;
            }
        }
        if doomed.iter().any(|target| self.doc.selection.references(*target)) {
            self.set_selection(Selection::None);
        }
        for target in doomed {
            let parent = self.doc.parent_of(target);
            if let Some(entity) = self.doc.raw_remove(target) {
                log::trace!("tx: delete {target}");
                self.journal.push(Change::Delete {
                    entity: Box::new(entity),
                    parent,
                });
            }
        }
        Ok(())
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn set_selection(&mut self, selection: Selection) {
        let before = std::mem::replace(&mut self.doc.selection, selection);
        if before == selection {
            return;
        }
        self.journal.push(Change::Select {
            before,
            after: selection,
        });
    }

    // ─── Completion ──────────────────────────────────────────────────────

    /// Publish every recorded change atomically.
    pub fn commit(mut self) -> ChangeSet {
        self.committed = true;
        let changes = std::mem::take(&mut self.journal);
        let set = self.doc.publish(changes);
        if !set.is_empty() {
            log::debug!(
                "tx: committed v{} ({} changes)",
                set.version,
                set.changes.len()
            );
        }
        set
    }

    fn rollback(&mut self) {
        log::warn!("tx: rolling back {} changes", self.journal.len());
        while let Some(change) = self.journal.pop() {
            if let Err(e) = self.undo(&change) {
                log::error!("tx: failed to undo {change:?}: {e}");
            }
        }
    }

    fn undo(&mut self, change: &Change) -> FigureResult<()> {
        match change {
            Change::Create { id, .. } => {
                self.doc.raw_remove(*id);
            }
            Change::Set { id, property, before, .. } => {
                self.doc.raw_set_text(*id, *property, before.clone())?;
            }
            Change::Insert { path, index, .. } => {
                self.doc.raw_remove_at(path, *index)?;
            }
            Change::Remove { path, index, id } => {
                self.doc.raw_insert(path, *index, *id)?;
            }
            Change::Delete { entity, parent } => {
                self.doc.raw_add((**entity).clone(), *parent);
            }
            Change::Select { before, .. } => {
                self.doc.selection = *before;
            }
        }
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.journal.is_empty() {
            self.rollback();
        }
    }
}

fn malformed(message: impl Into<String>) -> FigureError {
    FigureError::MalformedPayload(message.into())
}
