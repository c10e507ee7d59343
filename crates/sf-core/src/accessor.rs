//! Positional Collection Accessor.
//!
//! Resolves ids to positions inside an ordered list property. Mutation by
//! position lives on [`Transaction`](crate::Transaction) so every insert and
//! removal is journaled.

use crate::error::{FigureError, FigureResult};
use crate::id::EntityId;
use crate::model::FigureDocument;
use crate::schema::Property;
use std::fmt;

/// Addresses one ordered list property: `owner.property`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListPath {
    pub owner: EntityId,
    pub property: Property,
}

impl ListPath {
    pub fn new(owner: EntityId, property: Property) -> Self {
        Self { owner, property }
    }
}

impl fmt::Display for ListPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.property)
    }
}

/// Index at which a new member should be inserted.
///
/// With no `after` sibling the index is the list length (append); otherwise it
/// is one past the sibling. A sibling that is not in the list is an error.
pub fn resolve_insert_index(
    doc: &FigureDocument,
    path: &ListPath,
    after: Option<EntityId>,
) -> FigureResult<usize> {
    let list = doc.list(path)?;
    match after {
        None => Ok(list.len()),
        Some(after) => index_of(doc, path, after).map(|index| index + 1),
    }
}

/// Position of `id` in the list at `path`.
pub fn index_of(doc: &FigureDocument, path: &ListPath, id: EntityId) -> FigureResult<usize> {
    doc.list(path)?
        .iter()
        .position(|member| *member == id)
        .ok_or(FigureError::NotInList { id, path: *path })
}

pub fn get_at(doc: &FigureDocument, path: &ListPath, index: usize) -> FigureResult<EntityId> {
    let list = doc.list(path)?;
    list.get(index)
        .copied()
        .ok_or(FigureError::IndexOutOfRange {
            path: *path,
            index,
            len: list.len(),
        })
}
