//! Error taxonomy for document operations.

use crate::accessor::ListPath;
use crate::asset::AssetError;
use crate::id::EntityId;
use crate::schema::{EntityKind, Property};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FigureError {
    #[error("Entity not found: {0}")]
    NotFound(EntityId),

    #[error("{id} is not a member of {path}")]
    NotInList { id: EntityId, path: ListPath },

    #[error("Index {index} out of range for {path} (length {len})")]
    IndexOutOfRange {
        path: ListPath,
        index: usize,
        len: usize,
    },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("{kind} has no property `{property}`")]
    UnknownProperty {
        kind: EntityKind,
        property: Property,
    },

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

impl FigureError {
    /// Whether the error names a missing entity or list member.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FigureError::NotFound(_) | FigureError::NotInList { .. })
    }
}

pub type FigureResult<T> = Result<T, FigureError>;
