//! UI commands that pick files before editing.
//!
//! A command first awaits the file-pick service, then performs its edit
//! synchronously. The pick always completes before any transaction opens,
//! and picking zero files is a normal outcome that edits nothing.

use crate::api::FigureApi;
use crate::context::EditorContext;
use serde::Serialize;
use sf_core::{EntityId, EntityKind, FigureResult, FilePayload};

/// What the host should let the user pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequest {
    /// MIME filter, e.g. `image/*`.
    pub accept: String,
    pub multiple: bool,
}

/// Host file-pick service.
#[allow(async_fn_in_trait)]
pub trait FilePicker {
    /// Resolve with the picked files; empty when the user cancelled.
    async fn request_files(&mut self, request: &FileRequest) -> Vec<FilePayload>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommandState {
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    AddPanel,
    AddFile,
}

/// A user-triggered editing command.
#[allow(async_fn_in_trait)]
pub trait Command {
    fn kind(&self) -> CommandKind;

    fn state<C: EditorContext>(&self, api: &FigureApi<C>) -> CommandState;

    /// Run the command, returning the ids of inserted entities.
    async fn execute<C: EditorContext, P: FilePicker>(
        &self,
        api: &mut FigureApi<C>,
        picker: &mut P,
    ) -> FigureResult<Vec<EntityId>>;
}

// ─── Add panel ───────────────────────────────────────────────────────────

/// Pick one image and insert a panel for it, after the selected panel when
/// there is one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddPanelCommand;

impl Command for AddPanelCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddPanel
    }

    fn state<C: EditorContext>(&self, _api: &FigureApi<C>) -> CommandState {
        CommandState { disabled: false }
    }

    async fn execute<C: EditorContext, P: FilePicker>(
        &self,
        api: &mut FigureApi<C>,
        picker: &mut P,
    ) -> FigureResult<Vec<EntityId>> {
        let request = FileRequest {
            accept: api.config().image_accept.clone(),
            multiple: false,
        };
        let files = picker.request_files(&request).await;
        let Some(image) = files.first() else {
            log::debug!("add panel: no image picked");
            return Ok(Vec::new());
        };
        let after = api.selected(EntityKind::Panel);
        let panel = api.insert_panel(image, after)?;
        Ok(vec![panel])
    }
}

// ─── Add file ────────────────────────────────────────────────────────────

/// Pick any number of files and insert them in pick order, starting after
/// the selected file or at the end of the list.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddFileCommand;

impl Command for AddFileCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddFile
    }

    fn state<C: EditorContext>(&self, _api: &FigureApi<C>) -> CommandState {
        CommandState { disabled: false }
    }

    async fn execute<C: EditorContext, P: FilePicker>(
        &self,
        api: &mut FigureApi<C>,
        picker: &mut P,
    ) -> FigureResult<Vec<EntityId>> {
        let request = FileRequest {
            accept: "*/*".to_string(),
            multiple: true,
        };
        let files = picker.request_files(&request).await;
        let mut after = api.selected(EntityKind::File);
        let mut inserted = Vec::with_capacity(files.len());
        for file in &files {
            let id = api.insert_file_after(file, after)?;
            after = Some(id);
            inserted.push(id);
        }
        log::debug!("add file: inserted {}", inserted.len());
        Ok(inserted)
    }
}
