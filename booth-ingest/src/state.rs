//! Shared application state

use std::sync::Arc;

use crate::groups::GroupStore;
use crate::hub::Hub;
use crate::register::RegisterHandle;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Fan-out hub (also owns the register handle it writes to)
    pub hub: Hub,
    /// Group storage for the lifecycle API
    pub groups: Arc<GroupStore>,
}

impl AppState {
    pub fn new(hub: Hub, groups: GroupStore) -> Self {
        Self {
            hub,
            groups: Arc::new(groups),
        }
    }

    pub fn register(&self) -> &RegisterHandle {
        self.hub.register()
    }
}
