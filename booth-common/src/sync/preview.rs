//! Preview side of the Cross-Tab Sync protocol
//!
//! The preview renders whatever the dashboard last selected and announces
//! `preview-status` whenever it starts or stops rendering. Dropping the
//! preview always announces "stopped", so a dashboard never keeps a stale
//! "previewing" badge after the view goes away.

use tracing::{debug, warn};

use super::SyncPeer;
use crate::api::{GroupDetail, GroupSource};
use crate::events::{GroupId, HubEvent, SyncMessage};

/// Public display state for cross-tab selection
pub struct PreviewSync {
    peer: SyncPeer,
    group: Option<GroupDetail>,
}

impl PreviewSync {
    /// Mount a preview with nothing rendered
    pub fn mount(peer: SyncPeer) -> Self {
        let preview = Self { peer, group: None };
        preview.announce();
        preview
    }

    /// Group currently rendered, if any
    pub fn current(&self) -> Option<&GroupDetail> {
        self.group.as_ref()
    }

    /// Announce the current rendering state
    ///
    /// Only a non-empty group is announced; "stopped" is announced by the
    /// transitions that clear the group.
    pub fn announce(&self) {
        if let Some(group) = &self.group {
            self.peer.broadcast_preview_status(true, Some(group.uuid.clone()));
        }
    }

    /// Render the selected group, or blank the display for `None`
    pub async fn on_group_selected<S: GroupSource>(
        &mut self,
        selection: Option<GroupId>,
        source: &S,
    ) {
        match selection {
            Some(id) => self.load(id, source).await,
            None => self.stop(),
        }
    }

    /// Refetch the rendered group when a new file landed in it
    ///
    /// Returns true if a refetch happened.
    pub async fn on_file_moved<S: GroupSource>(&mut self, event: &HubEvent, source: &S) -> bool {
        let HubEvent::FileMoved { file_name, group_id } = event else {
            return false;
        };
        let showing = self.group.as_ref().map(|g| &g.uuid);
        if showing != Some(group_id) {
            debug!(group = %group_id, file = %file_name, "File moved into a group not on display");
            return false;
        }

        self.load(group_id.clone(), source).await;
        true
    }

    /// Handle one message received from another view
    pub async fn handle<S: GroupSource>(&mut self, message: SyncMessage, source: &S) {
        match message {
            SyncMessage::GroupSelected { group_uuid } => {
                self.on_group_selected(group_uuid, source).await;
            }
            SyncMessage::PreviewStatus { .. } => {
                debug!("Preview ignoring preview-status from another view");
            }
        }
    }

    /// Handle every message already delivered
    pub async fn drain<S: GroupSource>(&mut self, source: &S) -> usize {
        let mut handled = 0;
        while let Some(message) = self.peer.try_recv() {
            self.handle(message, source).await;
            handled += 1;
        }
        handled
    }

    async fn load<S: GroupSource>(&mut self, id: GroupId, source: &S) {
        match source.fetch_group(&id).await {
            Ok(detail) => {
                self.group = Some(detail);
                self.peer.broadcast_preview_status(true, Some(id));
            }
            Err(e) => {
                warn!(group = %id, "Failed to fetch group: {}", e);
                self.stop();
            }
        }
    }

    fn stop(&mut self) {
        self.group = None;
        self.peer.broadcast_preview_status(false, None);
    }
}

impl Drop for PreviewSync {
    fn drop(&mut self) {
        self.peer.broadcast_preview_status(false, None);
    }
}
