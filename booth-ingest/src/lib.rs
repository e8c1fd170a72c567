//! booth-ingest library - live capture ingestion service
//!
//! Watches the landing zone for new captures, watermarks each one into the
//! active group's draft directory, and fans `FILE_MOVED` out to every
//! connected viewer over the hub WebSocket. The same server carries the
//! group lifecycle API.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod error;
pub mod groups;
pub mod hub;
pub mod register;
pub mod relocate;
pub mod state;
pub mod watcher;
pub mod watermark;

pub use error::{Error, Result};
pub use state::AppState;

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let groups = Router::new()
        .route("/api/groups", get(api::list_groups).post(api::create_group))
        .route("/api/group/:uuid", get(api::get_group))
        .route("/api/group/:uuid/move", post(api::move_group))
        .route("/api/active-group", get(api::get_active_group));

    Router::new()
        .route("/ws", get(hub::ws_upgrade))
        .merge(groups)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
