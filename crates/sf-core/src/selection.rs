//! The Selection Pointer: which entity or value the UI treats as active.

use crate::id::EntityId;
use crate::schema::Property;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Selection {
    #[default]
    None,
    /// A whole entity.
    #[serde(rename_all = "camelCase")]
    Node { node_id: EntityId },
    /// One value of a many-valued property, e.g. a file attached to a panel.
    #[serde(rename_all = "camelCase")]
    Value {
        node_id: EntityId,
        property: Property,
        value_id: EntityId,
    },
}

impl Selection {
    pub fn node(node_id: EntityId) -> Self {
        Selection::Node { node_id }
    }

    pub fn value(node_id: EntityId, property: Property, value_id: EntityId) -> Self {
        Selection::Value {
            node_id,
            property,
            value_id,
        }
    }

    /// The entity this selection is anchored on.
    pub fn node_id(&self) -> Option<EntityId> {
        match self {
            Selection::None => None,
            Selection::Node { node_id } | Selection::Value { node_id, .. } => Some(*node_id),
        }
    }

    /// Whether the selection mentions `id` as node or value.
    pub fn references(&self, id: EntityId) -> bool {
        match self {
            Selection::None => false,
            Selection::Node { node_id } => *node_id == id,
            Selection::Value {
                node_id, value_id, ..
            } => *node_id == id || *value_id == id,
        }
    }
}
