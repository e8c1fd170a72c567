//! Dashboard side of the Cross-Tab Sync protocol
//!
//! The dashboard announces `group-selected` while its "preview enabled" toggle
//! is on, and listens for `preview-status` only to drive an informational
//! badge. It never blocks on the preview.

use tracing::{debug, warn};

use super::SyncPeer;
use crate::api::{GroupDetail, GroupSource};
use crate::events::{GroupId, SyncMessage};

/// What the dashboard shows about the preview display
///
/// Reflects only the latest `preview-status` received; absence of any status
/// means "not previewing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewBadge {
    pub is_active: bool,
    pub group: Option<GroupId>,
}

/// Control view state for cross-tab selection
pub struct DashboardSync {
    peer: SyncPeer,
    preview_enabled: bool,
    selected: Option<GroupId>,
    badge: PreviewBadge,
}

impl DashboardSync {
    /// Preview is enabled on a fresh dashboard
    pub fn new(peer: SyncPeer) -> Self {
        Self {
            peer,
            preview_enabled: true,
            selected: None,
            badge: PreviewBadge::default(),
        }
    }

    pub fn preview_enabled(&self) -> bool {
        self.preview_enabled
    }

    pub fn selected(&self) -> Option<&GroupId> {
        self.selected.as_ref()
    }

    pub fn badge(&self) -> &PreviewBadge {
        &self.badge
    }

    /// Whether the preview reports rendering `group`
    pub fn is_previewing(&self, group: &GroupId) -> bool {
        self.badge.is_active && self.badge.group.as_ref() == Some(group)
    }

    /// Select a group (or clear the selection) and load its details
    ///
    /// A group that loads is announced to previews; a failed load or a cleared
    /// selection blanks them. Nothing is announced while preview is disabled.
    pub async fn select_group<S: GroupSource>(
        &mut self,
        group: Option<GroupId>,
        source: &S,
    ) -> Option<GroupDetail> {
        self.selected = group.clone();

        let Some(id) = group else {
            self.announce(None);
            return None;
        };

        match source.fetch_group(&id).await {
            Ok(detail) => {
                self.announce(Some(id));
                Some(detail)
            }
            Err(e) => {
                warn!(group = %id, "Failed to fetch group: {}", e);
                self.announce(None);
                None
            }
        }
    }

    /// Flip the "preview enabled" toggle
    ///
    /// Turning it on re-announces the current selection; turning it off blanks
    /// the preview immediately.
    pub fn toggle_preview(&mut self) -> bool {
        self.preview_enabled = !self.preview_enabled;

        if self.preview_enabled {
            if let Some(id) = self.selected.clone() {
                self.peer.broadcast_group_selection(Some(id));
            }
        } else {
            self.peer.broadcast_group_selection(None);
        }

        self.preview_enabled
    }

    /// Apply one message received from another view
    pub fn apply(&mut self, message: SyncMessage) {
        match message {
            SyncMessage::PreviewStatus {
                is_active,
                previewing_group_uuid,
            } => {
                self.badge = PreviewBadge {
                    is_active,
                    group: previewing_group_uuid,
                };
            }
            SyncMessage::GroupSelected { .. } => {
                debug!("Dashboard ignoring group-selected from another view");
            }
        }
    }

    /// Apply every message already delivered; returns how many were applied
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Some(message) = self.peer.try_recv() {
            self.apply(message);
            applied += 1;
        }
        applied
    }

    fn announce(&self, group: Option<GroupId>) {
        if self.preview_enabled {
            self.peer.broadcast_group_selection(group);
        }
    }
}
