pub mod accessor;
pub mod asset;
pub mod error;
pub mod id;
pub mod materialize;
pub mod model;
pub mod schema;
pub mod selection;
pub mod transaction;

pub use accessor::{ListPath, get_at, index_of, resolve_insert_index};
pub use asset::{AssetError, AssetRef, AssetSource, AssetStore, FilePayload, MemoryArchive};
pub use error::{FigureError, FigureResult};
pub use id::EntityId;
pub use model::*;
pub use schema::{EntityKind, Property, PropertySpec, PropertyType};
pub use selection::Selection;
pub use transaction::{Change, ChangeSet, ChangeSummary, Transaction};
