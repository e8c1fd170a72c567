//! Group API shared between the booth service and its viewers

pub mod types;

pub use types::{
    CreateGroupRequest, ErrorResponse, Folder, GroupDetail, GroupListing, GroupMeta,
    GroupSummary, MoveAction, MoveRequest,
};

use std::future::Future;

use crate::{GroupId, Result};

/// Anything that can fetch a group's current contents
///
/// The booth service implements this directly over its storage; viewers
/// implement it over HTTP (`GET /api/group/:uuid`).
pub trait GroupSource {
    fn fetch_group(&self, id: &GroupId) -> impl Future<Output = Result<GroupDetail>> + Send;
}
