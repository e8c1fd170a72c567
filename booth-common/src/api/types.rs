//! Shared API request/response types for the group endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, GroupId};

// ========================================
// Lifecycle
// ========================================

/// Lifecycle folder a group directory lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    Draft,
    Sent,
    Trash,
}

impl Folder {
    /// Lookup order when resolving a group by id
    pub const ALL: [Folder; 3] = [Folder::Draft, Folder::Sent, Folder::Trash];

    /// Directory name under the storage root
    pub fn dir_name(self) -> &'static str {
        match self {
            Folder::Draft => "draft",
            Folder::Sent => "sent",
            Folder::Trash => "trash",
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Lifecycle move requested through `POST /api/group/:uuid/move`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveAction {
    /// draft → sent
    Send,
    /// draft | sent → trash
    Delete,
    /// trash → draft
    Restore,
    /// sent → draft
    ReDraft,
}

impl MoveAction {
    /// Destination folder for a group currently in `from`
    pub fn target(self, from: Folder) -> Result<Folder, Error> {
        match (self, from) {
            (MoveAction::Send, Folder::Draft) => Ok(Folder::Sent),
            (MoveAction::Send, _) => Err(Error::InvalidInput("Group is not a draft".to_string())),
            (MoveAction::Delete, Folder::Draft | Folder::Sent) => Ok(Folder::Trash),
            (MoveAction::Delete, Folder::Trash) => {
                Err(Error::InvalidInput("Group cannot be deleted".to_string()))
            }
            (MoveAction::Restore, Folder::Trash) => Ok(Folder::Draft),
            (MoveAction::Restore, _) => {
                Err(Error::InvalidInput("Group is not in trash".to_string()))
            }
            (MoveAction::ReDraft, Folder::Sent) => Ok(Folder::Draft),
            (MoveAction::ReDraft, _) => {
                Err(Error::InvalidInput("Group is not a sent group".to_string()))
            }
        }
    }
}

// ========================================
// Storage Types
// ========================================

/// Contents of a group's `meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMeta {
    /// Attendee IDs clustered into this group
    pub ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ========================================
// Response Types
// ========================================

/// One entry of `GET /api/groups`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub uuid: GroupId,
    pub created_at: DateTime<Utc>,
    pub ids: Vec<String>,
    /// Files in the group directory, excluding `meta.json`
    pub image_count: usize,
}

/// `GET /api/groups` response, grouped by lifecycle folder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupListing {
    pub drafts: Vec<GroupSummary>,
    pub sent: Vec<GroupSummary>,
    pub trash: Vec<GroupSummary>,
}

/// `GET /api/group/:uuid` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    pub uuid: GroupId,
    pub folder: Folder,
    pub ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// File names in the group directory, excluding `meta.json`
    pub images: Vec<String>,
}

/// Error body returned by the group endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

// ========================================
// Request Types
// ========================================

/// `POST /api/groups` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    /// Optional caller-chosen identifier; generated when absent
    #[serde(default)]
    pub uuid: Option<GroupId>,
    #[serde(default)]
    pub ids: Vec<String>,
}

/// `POST /api/group/:uuid/move` body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub action: MoveAction,
}
