//! Figure document data model.
//!
//! The document is a tree of typed entities. Entities are stored as nodes of
//! a petgraph `StableDiGraph`; an edge parent→child, labelled with the owning
//! property, exists for every owned child (a panel's `image`, each member of
//! an owned list such as `panels` or `legend`). Reference lists like
//! `panel.files` point at entities owned elsewhere and carry no edge.
//!
//! All mutation goes through a [`Transaction`]. The `raw_*` methods below are
//! the unjournaled primitives a transaction (and its rollback) is built on.

use crate::accessor::ListPath;
use crate::error::{FigureError, FigureResult};
use crate::id::EntityId;
use crate::schema::{EntityKind, Property, PropertyType};
use crate::selection::Selection;
use crate::transaction::{Change, ChangeSet, Transaction};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::{DfsPostOrder, EdgeRef};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Ordered list of entity ids as stored in list properties.
pub type IdList = SmallVec<[EntityId; 4]>;

/// Default number of committed change sets a document retains.
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

// ─── Entities ────────────────────────────────────────────────────────────

/// Stored value of a single property.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Id(EntityId),
    List(IdList),
}

/// A typed node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    props: BTreeMap<Property, Value>,
}

impl Entity {
    /// Create an entity with every list property initialized empty.
    pub fn new(id: EntityId, kind: EntityKind) -> Self {
        let props = kind
            .schema()
            .iter()
            .filter(|spec| spec.ty.is_list())
            .map(|spec| (spec.property, Value::List(IdList::new())))
            .collect();
        Self { id, kind, props }
    }

    pub fn with_text(self, property: Property, text: impl Into<String>) -> Self {
        self.with_value(property, Value::Text(text.into()))
    }

    pub fn with_value(mut self, property: Property, value: Value) -> Self {
        self.props.insert(property, value);
        self
    }

    pub fn get(&self, property: Property) -> Option<&Value> {
        self.props.get(&property)
    }

    pub fn text(&self, property: Property) -> Option<&str> {
        match self.props.get(&property) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn child(&self, property: Property) -> Option<EntityId> {
        match self.props.get(&property) {
            Some(Value::Id(id)) => Some(*id),
            _ => None,
        }
    }

    /// Members of a list property; empty when the property is absent.
    pub fn list(&self, property: Property) -> &[EntityId] {
        match self.props.get(&property) {
            Some(Value::List(ids)) => ids,
            _ => &[],
        }
    }

    pub fn properties(&self) -> impl Iterator<Item = (Property, &Value)> {
        self.props.iter().map(|(p, v)| (*p, v))
    }

    /// Owned children with the property holding them, in schema order.
    pub fn owned(&self) -> Vec<(Property, EntityId)> {
        let mut out = Vec::new();
        for spec in self.kind.schema().iter().filter(|s| s.ty.owns()) {
            match self.props.get(&spec.property) {
                Some(Value::Id(id)) => out.push((spec.property, *id)),
                Some(Value::List(ids)) => out.extend(ids.iter().map(|id| (spec.property, *id))),
                _ => {}
            }
        }
        out
    }

    pub(crate) fn list_mut(&mut self, property: Property) -> Option<&mut IdList> {
        match self.props.get_mut(&property) {
            Some(Value::List(ids)) => Some(ids),
            _ => None,
        }
    }

    pub(crate) fn put_text(&mut self, property: Property, text: Option<String>) -> Option<String> {
        let previous = match text {
            Some(text) => self.props.insert(property, Value::Text(text)),
            None => self.props.remove(&property),
        };
        match previous {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }
}

// ─── Document ────────────────────────────────────────────────────────────

/// A figure document: root entity, entity graph, and the Selection Pointer.
#[derive(Debug, Clone)]
pub struct FigureDocument {
    pub(crate) graph: StableDiGraph<Entity, Property>,
    pub(crate) root: NodeIndex,
    pub(crate) id_index: HashMap<EntityId, NodeIndex>,
    pub(crate) selection: Selection,
    history: VecDeque<ChangeSet>,
    history_depth: usize,
    version: u64,
}

impl FigureDocument {
    /// Create an empty document with a root owning empty `panels`, `files`
    /// and `resources` lists.
    #[must_use]
    pub fn new() -> Self {
        Self::with_history_depth(DEFAULT_HISTORY_DEPTH)
    }

    #[must_use]
    pub fn with_history_depth(history_depth: usize) -> Self {
        let mut graph = StableDiGraph::new();
        let root_id = EntityId::root();
        let root = graph.add_node(Entity::new(root_id, EntityKind::Document));

        let mut id_index = HashMap::new();
        id_index.insert(root_id, root);

        Self {
            graph,
            root,
            id_index,
            selection: Selection::None,
            history: VecDeque::with_capacity(history_depth.min(DEFAULT_HISTORY_DEPTH)),
            history_depth,
            version: 0,
        }
    }

    pub fn root_id(&self) -> EntityId {
        self.graph[self.root].id
    }

    pub fn root(&self) -> &Entity {
        &self.graph[self.root]
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Like [`get`](Self::get) but reports a missing entity as `NotFound`.
    pub fn entity(&self, id: EntityId) -> FigureResult<&Entity> {
        self.get(id).ok_or(FigureError::NotFound(id))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Number of entities, including the root.
    pub fn entity_count(&self) -> usize {
        self.id_index.len()
    }

    /// Whether anything besides the root exists.
    pub fn has_content(&self) -> bool {
        self.id_index.len() > 1
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// The owning entity and the property holding `id`.
    pub fn parent_of(&self, id: EntityId) -> Option<(EntityId, Property)> {
        let idx = self.id_index.get(&id)?;
        self.graph
            .edges_directed(*idx, Direction::Incoming)
            .next()
            .map(|edge| (self.graph[edge.source()].id, *edge.weight()))
    }

    /// Index of `id` inside the owned list that holds it.
    pub fn position_of(&self, id: EntityId) -> FigureResult<usize> {
        let (owner, property) = self.parent_of(id).ok_or_else(|| {
            FigureError::InvalidStructure(format!("{id} is not attached to a parent"))
        })?;
        let path = ListPath::new(owner, property);
        self.list(&path)?
            .iter()
            .position(|member| *member == id)
            .ok_or(FigureError::NotInList { id, path })
    }

    /// Members of the list at `path`.
    pub fn list(&self, path: &ListPath) -> FigureResult<&[EntityId]> {
        self.list_type(path)?;
        Ok(self.entity(path.owner)?.list(path.property))
    }

    /// Schema type of the list at `path`, validating that it is a list.
    pub fn list_type(&self, path: &ListPath) -> FigureResult<PropertyType> {
        let owner = self.entity(path.owner)?;
        let spec = owner
            .kind
            .spec(path.property)
            .ok_or(FigureError::UnknownProperty {
                kind: owner.kind,
                property: path.property,
            })?;
        if !spec.ty.is_list() {
            return Err(FigureError::InvalidStructure(format!(
                "{path} is not a list property"
            )));
        }
        Ok(spec.ty)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Number of committed, non-empty transactions.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Retained committed change sets, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ChangeSet> {
        self.history.iter()
    }

    pub fn history_depth(&self) -> usize {
        self.history_depth
    }

    /// Change how many change sets are retained, dropping the oldest ones
    /// beyond the new depth.
    pub fn set_history_depth(&mut self, depth: usize) {
        self.history_depth = depth;
        while self.history.len() > depth {
            self.history.pop_front();
        }
    }

    pub fn last_change(&self) -> Option<&ChangeSet> {
        self.history.back()
    }

    /// Generate an id for a new entity of `kind` that is unused in this document.
    pub fn fresh_id(&self, kind: EntityKind) -> EntityId {
        loop {
            let id = EntityId::with_prefix(kind.id_prefix());
            if !self.contains(id) {
                return id;
            }
        }
    }

    /// Open a transaction. Dropping it without [`Transaction::commit`] rolls
    /// every recorded change back.
    pub fn begin(&mut self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Run `f` inside a transaction, committing on `Ok` and rolling back on `Err`.
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Transaction<'_>) -> FigureResult<T>,
    ) -> FigureResult<T> {
        let mut tx = self.begin();
        let value = f(&mut tx)?;
        tx.commit();
        Ok(value)
    }

    // ─── Traversal ───────────────────────────────────────────────────────

    /// `id` and all entities it transitively owns, children before parents.
    pub(crate) fn subtree_post_order(&self, id: EntityId) -> FigureResult<Vec<EntityId>> {
        let start = self.index(id)?;
        let mut dfs = DfsPostOrder::new(&self.graph, start);
        let mut out = Vec::new();
        while let Some(idx) = dfs.next(&self.graph) {
            out.push(self.graph[idx].id);
        }
        Ok(out)
    }

    /// First reference list slot pointing at `target`.
    pub(crate) fn find_reference(&self, target: EntityId) -> Option<(ListPath, usize)> {
        self.entities().find_map(|entity| {
            entity
                .kind
                .schema()
                .iter()
                .filter(|spec| matches!(spec.ty, PropertyType::References(_)))
                .find_map(|spec| {
                    entity
                        .list(spec.property)
                        .iter()
                        .position(|member| *member == target)
                        .map(|index| (ListPath::new(entity.id, spec.property), index))
                })
        })
    }

    fn index(&self, id: EntityId) -> FigureResult<NodeIndex> {
        self.id_index
            .get(&id)
            .copied()
            .ok_or(FigureError::NotFound(id))
    }

    // ─── Raw primitives (unjournaled) ────────────────────────────────────

    /// Add an entity, wiring containment edges to any existing, unowned
    /// children it lists and from `parent` when given.
    pub(crate) fn raw_add(&mut self, entity: Entity, parent: Option<(EntityId, Property)>) {
        let id = entity.id;
        let owned = entity.owned();
        let idx = self.graph.add_node(entity);
        self.id_index.insert(id, idx);

        for (property, child) in owned {
            if let Some(child_idx) = self.id_index.get(&child).copied()
                && self.parent_of(child).is_none()
            {
                self.graph.add_edge(idx, child_idx, property);
            }
        }
        if let Some((parent, property)) = parent
            && let Some(parent_idx) = self.id_index.get(&parent).copied()
        {
            self.graph.add_edge(parent_idx, idx, property);
        }
    }

    pub(crate) fn raw_remove(&mut self, id: EntityId) -> Option<Entity> {
        let idx = self.id_index.remove(&id)?;
        self.graph.remove_node(idx)
    }

    pub(crate) fn raw_insert(
        &mut self,
        path: &ListPath,
        index: usize,
        child: EntityId,
    ) -> FigureResult<()> {
        let owns = self.list_type(path)?.owns();
        let owner_idx = self.index(path.owner)?;
        let child_idx = self.index(child)?;
        let list = self.graph[owner_idx]
            .list_mut(path.property)
            .ok_or_else(|| FigureError::InvalidStructure(format!("{path} is not initialized")))?;
        if index > list.len() {
            return Err(FigureError::IndexOutOfRange {
                path: *path,
                index,
                len: list.len(),
            });
        }
        list.insert(index, child);
        if owns {
            self.graph.add_edge(owner_idx, child_idx, path.property);
        }
        Ok(())
    }

    pub(crate) fn raw_remove_at(
        &mut self,
        path: &ListPath,
        index: usize,
    ) -> FigureResult<EntityId> {
        let owns = self.list_type(path)?.owns();
        let owner_idx = self.index(path.owner)?;
        let list = self.graph[owner_idx]
            .list_mut(path.property)
            .ok_or_else(|| FigureError::InvalidStructure(format!("{path} is not initialized")))?;
        if index >= list.len() {
            return Err(FigureError::IndexOutOfRange {
                path: *path,
                index,
                len: list.len(),
            });
        }
        let child = list.remove(index);
        if owns
            && let Some(child_idx) = self.id_index.get(&child).copied()
            && let Some(edge) = self.graph.find_edge(owner_idx, child_idx)
        {
            self.graph.remove_edge(edge);
        }
        Ok(child)
    }

    pub(crate) fn raw_set_text(
        &mut self,
        id: EntityId,
        property: Property,
        text: Option<String>,
    ) -> FigureResult<Option<String>> {
        let idx = self.index(id)?;
        Ok(self.graph[idx].put_text(property, text))
    }

    /// Record a committed transaction. Empty change lists leave the version alone.
    pub(crate) fn publish(&mut self, changes: Vec<Change>) -> ChangeSet {
        if changes.is_empty() {
            return ChangeSet {
                version: self.version,
                changes,
            };
        }
        self.version += 1;
        let set = ChangeSet {
            version: self.version,
            changes,
        };
        if self.history_depth > 0 {
            if self.history.len() == self.history_depth {
                self.history.pop_front();
            }
            self.history.push_back(set.clone());
        }
        set
    }
}

impl Default for FigureDocument {
    fn default() -> Self {
        Self::new()
    }
}
