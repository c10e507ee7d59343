//! Editing context: the capabilities every editing operation is built on.

use crate::config::EditorConfig;
use sf_core::{AssetStore, FigureDocument, FigureResult, MemoryArchive, Transaction};

/// Document, asset store and configuration behind an editing API.
///
/// The API object composes a context instead of owning these directly, so
/// hosts can supply their own asset store or share a document.
pub trait EditorContext {
    type Assets: AssetStore;

    fn document(&self) -> &FigureDocument;
    fn document_mut(&mut self) -> &mut FigureDocument;
    fn assets(&self) -> &Self::Assets;
    fn assets_mut(&mut self) -> &mut Self::Assets;
    fn config(&self) -> &EditorConfig;

    /// Run `f` in one document transaction.
    fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Transaction<'_>) -> FigureResult<T>,
    ) -> FigureResult<T> {
        self.document_mut().transaction(f)
    }
}

/// An editing session that exclusively owns its document and asset store.
#[derive(Debug)]
pub struct EditorSession<A = MemoryArchive> {
    document: FigureDocument,
    assets: A,
    config: EditorConfig,
}

impl<A: AssetStore> EditorSession<A> {
    /// Start a session on an empty document.
    pub fn new(assets: A, config: EditorConfig) -> Self {
        let document = FigureDocument::with_history_depth(config.history_depth);
        Self::with_document(document, assets, config)
    }

    /// Resume a session on an existing document. The config's history depth
    /// replaces the document's own.
    pub fn with_document(mut document: FigureDocument, assets: A, config: EditorConfig) -> Self {
        document.set_history_depth(config.history_depth);
        Self {
            document,
            assets,
            config,
        }
    }

    pub fn into_parts(self) -> (FigureDocument, A) {
        (self.document, self.assets)
    }
}

impl EditorSession<MemoryArchive> {
    /// Session backed by an in-memory archive and default settings.
    pub fn in_memory() -> Self {
        Self::new(MemoryArchive::new(), EditorConfig::default())
    }
}

impl<A: AssetStore> EditorContext for EditorSession<A> {
    type Assets = A;

    fn document(&self) -> &FigureDocument {
        &self.document
    }

    fn document_mut(&mut self) -> &mut FigureDocument {
        &mut self.document
    }

    fn assets(&self) -> &A {
        &self.assets
    }

    fn assets_mut(&mut self) -> &mut A {
        &mut self.assets
    }

    fn config(&self) -> &EditorConfig {
        &self.config
    }
}
