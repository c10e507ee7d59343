pub mod api;
pub mod commands;
pub mod config;
pub mod context;
pub mod insert;
pub mod reconcile;

pub use api::{FigureApi, KeywordGroupUpdate};
pub use commands::{
    AddFileCommand, AddPanelCommand, Command, CommandKind, CommandState, FilePicker, FileRequest,
};
pub use config::EditorConfig;
pub use context::{EditorContext, EditorSession};
pub use insert::{InsertTarget, insert_entity};
pub use reconcile::{KeywordDraft, ReconcileStats, reconcile_keywords};
