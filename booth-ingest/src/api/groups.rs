//! Group lifecycle endpoints
//!
//! Routine filesystem CRUD over [`GroupStore`](crate::groups::GroupStore):
//! list, create, detail, and lifecycle moves between draft/sent/trash.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use booth_common::api::{
    CreateGroupRequest, Folder, GroupDetail, GroupListing, GroupSummary, MoveRequest,
};
use booth_common::GroupId;
use serde::Serialize;

use super::ApiError;
use crate::AppState;

/// GET /api/groups
pub async fn list_groups(State(state): State<AppState>) -> Result<Json<GroupListing>, ApiError> {
    Ok(Json(state.groups.list().await?))
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<AppState>,
    payload: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GroupSummary>), ApiError> {
    let Json(request) = payload?;
    let created = state.groups.create(request.uuid, request.ids).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/group/:uuid
pub async fn get_group(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<GroupDetail>, ApiError> {
    let id = GroupId::new(uuid)?;
    Ok(Json(state.groups.get(&id).await?))
}

/// Response for a lifecycle move
#[derive(Debug, Serialize)]
pub struct MoveResponse {
    pub message: String,
    pub folder: Folder,
}

/// POST /api/group/:uuid/move
pub async fn move_group(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<MoveResponse>, ApiError> {
    let id = GroupId::new(uuid)?;
    let Json(request) = payload
        .map_err(|_| booth_common::Error::InvalidInput("Invalid action".to_string()))?;
    let folder = state.groups.move_group(&id, request.action).await?;
    Ok(Json(MoveResponse {
        message: format!("Group moved to {folder}"),
        folder,
    }))
}

/// Read-only view of the active group register
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGroupResponse {
    pub group_id: Option<GroupId>,
}

/// GET /api/active-group
///
/// The register is only written through the hub's `SET_ACTIVE_GROUP`.
pub async fn get_active_group(State(state): State<AppState>) -> Json<ActiveGroupResponse> {
    Json(ActiveGroupResponse {
        group_id: state.register().snapshot(),
    })
}
