//! Asset store contract and an in-memory archive.
//!
//! Entities never own binaries. Registering a binary (or a remote descriptor)
//! yields an opaque `AssetRef` that is stored in an entity's `src` attribute.
//! Registration happens before the structural transaction opens, so a failed
//! or abandoned registration never leaves partial document state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Opaque reference returned by an asset store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A picked or uploaded binary with its MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl FilePayload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

impl fmt::Debug for FilePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePayload")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// What gets registered with the asset store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Binary content owned by the archive.
    Upload(FilePayload),
    /// A file that stays remote; only its descriptor is registered.
    Remote {
        name: String,
        url: String,
        mime_type: Option<String>,
    },
}

impl AssetSource {
    pub fn name(&self) -> &str {
        match self {
            AssetSource::Upload(file) => &file.name,
            AssetSource::Remote { name, .. } => name,
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            AssetSource::Upload(file) => Some(&file.mime_type),
            AssetSource::Remote { mime_type, .. } => mime_type.as_deref(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            AssetSource::Upload(_) => None,
            AssetSource::Remote { url, .. } => Some(url),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(AssetRef),

    #[error("Asset rejected: {0}")]
    Rejected(String),
}

/// External asset storage. Calls must be safe to make speculatively: a
/// registered asset that no entity ends up referencing is simply orphaned.
pub trait AssetStore {
    /// Register a binary or remote descriptor, returning its reference.
    fn add_asset(&mut self, source: &AssetSource) -> Result<AssetRef, AssetError>;

    /// Register new content in place of `old`, returning the new reference.
    fn replace_asset(
        &mut self,
        old: &AssetRef,
        file: &FilePayload,
    ) -> Result<AssetRef, AssetError>;

    /// Look up a registered asset.
    fn get_asset(&self, asset: &AssetRef) -> Option<&AssetSource>;
}

// ─── In-memory archive ───────────────────────────────────────────────────

/// Asset store kept in process memory.
///
/// Re-registering an identical source returns the reference it already has,
/// so speculative registrations never pile up duplicates.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    assets: HashMap<AssetRef, AssetSource>,
    next: u64,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn store(&mut self, source: AssetSource) -> Result<AssetRef, AssetError> {
        if source.name().trim().is_empty() {
            return Err(AssetError::Rejected("asset name is empty".to_string()));
        }
        if let Some((existing, _)) = self.assets.iter().find(|(_, s)| **s == source) {
            return Ok(existing.clone());
        }
        let asset = AssetRef::new(format!("{}-{}", self.next, source.name()));
        self.next += 1;
        log::trace!("archive: registered {asset}");
        self.assets.insert(asset.clone(), source);
        Ok(asset)
    }
}

impl AssetStore for MemoryArchive {
    fn add_asset(&mut self, source: &AssetSource) -> Result<AssetRef, AssetError> {
        self.store(source.clone())
    }

    fn replace_asset(
        &mut self,
        old: &AssetRef,
        file: &FilePayload,
    ) -> Result<AssetRef, AssetError> {
        if !self.assets.contains_key(old) {
            return Err(AssetError::NotFound(old.clone()));
        }
        self.store(AssetSource::Upload(file.clone()))
    }

    fn get_asset(&self, asset: &AssetRef) -> Option<&AssetSource> {
        self.assets.get(asset)
    }
}
