//! # Booth Common Library
//!
//! Shared code for the photo booth services and viewers:
//! - Wire vocabulary (group identifiers, hub events, cross-tab sync messages)
//! - Group API types
//! - Configuration file resolution
//! - Typed pub/sub channel abstraction
//! - Cross-tab sync fabric with the dashboard and preview protocols
//! - Viewer-side hub client

pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod hub_client;
pub mod sync;

pub use error::{Error, Result};
pub use events::{GroupId, HubEvent, SyncMessage};
