//! Editor configuration.

use serde::{Deserialize, Serialize};

/// Editor-wide settings, read from camelCase JSON with every field optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Point the selection at newly inserted entities. Default: **true**.
    pub select_inserted: bool,

    /// Committed change sets the document keeps. Default: **100**.
    pub history_depth: usize,

    /// Empty paragraphs in the default legend of new panels, files and
    /// resources. Default: **1**.
    pub legend_paragraphs: usize,

    /// MIME filter used when picking a panel image. Default: `image/*`.
    pub image_accept: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            select_inserted: true,
            history_depth: 100,
            legend_paragraphs: 1,
            image_accept: "image/*".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
