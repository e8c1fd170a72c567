//! Cross-Tab Sync wire messages

use serde::{Deserialize, Serialize};

use super::GroupId;

/// Messages exchanged between same-origin views
///
/// - `{"type":"group-selected","groupUuid":"..."|null}` (dashboard → preview)
/// - `{"type":"preview-status","isActive":bool,"previewingGroupUuid":"..."|null}`
///   (preview → dashboard)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncMessage {
    /// Render this group, or nothing
    #[serde(rename_all = "camelCase")]
    GroupSelected {
        #[serde(default)]
        group_uuid: Option<GroupId>,
    },

    /// The preview is (or is not) currently rendering a group
    #[serde(rename_all = "camelCase")]
    PreviewStatus {
        #[serde(default)]
        is_active: bool,
        #[serde(default)]
        previewing_group_uuid: Option<GroupId>,
    },
}

impl SyncMessage {
    pub fn group_selected(group: Option<GroupId>) -> Self {
        SyncMessage::GroupSelected { group_uuid: group }
    }

    pub fn preview_status(is_active: bool, group: Option<GroupId>) -> Self {
        SyncMessage::PreviewStatus {
            is_active,
            previewing_group_uuid: group,
        }
    }
}
