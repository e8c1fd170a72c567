//! Cross-view sync scenarios through the public API
//!
//! Tests cover:
//! - Dashboard selection driving every open preview
//! - Preview status feeding back into the dashboard badge
//! - Preview toggle, late-opened previews, closed previews
//! - Degraded operation without a shared channel

use booth_common::api::{Folder, GroupDetail, GroupSource};
use booth_common::sync::{DashboardSync, PreviewSync, SyncBus, SyncPeer};
use booth_common::{Error, GroupId, HubEvent, Result};
use chrono::Utc;
use std::collections::HashMap;

/// Test helper: in-memory group source
struct Groups(HashMap<String, Vec<String>>);

impl Groups {
    fn with(groups: Vec<(&str, Vec<&str>)>) -> Self {
        Self(
            groups
                .into_iter()
                .map(|(id, images)| {
                    (id.to_string(), images.into_iter().map(String::from).collect())
                })
                .collect(),
        )
    }
}

impl GroupSource for Groups {
    async fn fetch_group(&self, id: &GroupId) -> Result<GroupDetail> {
        let images = self
            .0
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Group not found: {id}")))?;
        Ok(GroupDetail {
            uuid: id.clone(),
            folder: Folder::Draft,
            ids: Vec::new(),
            created_at: Utc::now(),
            images,
        })
    }
}

fn group(id: &str) -> GroupId {
    GroupId::new(id).unwrap()
}

fn shown(preview: &PreviewSync) -> Option<&str> {
    preview.current().map(|g| g.uuid.as_str())
}

#[tokio::test]
async fn test_selection_reaches_every_preview() {
    let groups = Groups::with(vec![("G1", vec!["a.png"]), ("G2", vec![])]);
    let bus = SyncBus::default();
    let mut dashboard = DashboardSync::new(bus.join());
    let mut left = PreviewSync::mount(bus.join());
    let mut right = PreviewSync::mount(bus.join());

    let detail = dashboard.select_group(Some(group("G1")), &groups).await;
    assert_eq!(detail.map(|d| d.images), Some(vec!["a.png".to_string()]));

    left.drain(&groups).await;
    right.drain(&groups).await;
    assert_eq!(shown(&left), Some("G1"));
    assert_eq!(shown(&right), Some("G1"));

    dashboard.drain();
    assert!(dashboard.is_previewing(&group("G1")));

    dashboard.select_group(Some(group("G2")), &groups).await;
    left.drain(&groups).await;
    right.drain(&groups).await;
    assert_eq!(shown(&left), Some("G2"));
    assert_eq!(shown(&right), Some("G2"));
}

#[tokio::test]
async fn test_toggle_blanks_and_restores_preview() {
    let groups = Groups::with(vec![("G1", vec![])]);
    let bus = SyncBus::default();
    let mut dashboard = DashboardSync::new(bus.join());
    let mut preview = PreviewSync::mount(bus.join());

    dashboard.select_group(Some(group("G1")), &groups).await;
    preview.drain(&groups).await;
    assert_eq!(shown(&preview), Some("G1"));

    assert!(!dashboard.toggle_preview());
    preview.drain(&groups).await;
    assert_eq!(shown(&preview), None);
    dashboard.drain();
    assert!(!dashboard.badge().is_active);

    // Selections made while disabled stay local
    dashboard.select_group(Some(group("G1")), &groups).await;
    assert_eq!(preview.drain(&groups).await, 0);

    assert!(dashboard.toggle_preview());
    preview.drain(&groups).await;
    assert_eq!(shown(&preview), Some("G1"));
}

#[tokio::test]
async fn test_failed_fetch_blanks_preview() {
    let groups = Groups::with(vec![("G1", vec![])]);
    let bus = SyncBus::default();
    let mut dashboard = DashboardSync::new(bus.join());
    let mut preview = PreviewSync::mount(bus.join());

    dashboard.select_group(Some(group("G1")), &groups).await;
    preview.drain(&groups).await;

    assert!(dashboard
        .select_group(Some(group("gone")), &groups)
        .await
        .is_none());
    preview.drain(&groups).await;
    assert_eq!(shown(&preview), None);
}

#[tokio::test]
async fn test_late_preview_waits_for_next_selection() {
    let groups = Groups::with(vec![("G1", vec![]), ("G2", vec![])]);
    let bus = SyncBus::default();
    let mut dashboard = DashboardSync::new(bus.join());
    dashboard.select_group(Some(group("G1")), &groups).await;

    let mut preview = PreviewSync::mount(bus.join());
    assert_eq!(preview.drain(&groups).await, 0);
    assert_eq!(shown(&preview), None);

    dashboard.select_group(Some(group("G2")), &groups).await;
    preview.drain(&groups).await;
    assert_eq!(shown(&preview), Some("G2"));
}

#[tokio::test]
async fn test_closed_preview_clears_badge() {
    let groups = Groups::with(vec![("G1", vec![])]);
    let bus = SyncBus::default();
    let mut dashboard = DashboardSync::new(bus.join());
    let mut preview = PreviewSync::mount(bus.join());

    dashboard.select_group(Some(group("G1")), &groups).await;
    preview.drain(&groups).await;
    dashboard.drain();
    assert!(dashboard.is_previewing(&group("G1")));

    drop(preview);
    dashboard.drain();
    assert!(!dashboard.badge().is_active);
    assert_eq!(dashboard.badge().group, None);
}

#[tokio::test]
async fn test_file_moved_refreshes_displayed_group_only() {
    let mut groups = Groups::with(vec![("G1", vec![]), ("G2", vec![])]);
    let bus = SyncBus::default();
    let mut dashboard = DashboardSync::new(bus.join());
    let mut preview = PreviewSync::mount(bus.join());

    dashboard.select_group(Some(group("G1")), &groups).await;
    preview.drain(&groups).await;

    groups.0.insert("G1".to_string(), vec!["new.png".to_string()]);
    let elsewhere = HubEvent::FileMoved {
        file_name: "other.png".to_string(),
        group_id: group("G2"),
    };
    assert!(!preview.on_file_moved(&elsewhere, &groups).await);

    let here = HubEvent::FileMoved {
        file_name: "new.png".to_string(),
        group_id: group("G1"),
    };
    assert!(preview.on_file_moved(&here, &groups).await);
    assert_eq!(preview.current().unwrap().images, vec!["new.png".to_string()]);
}

#[tokio::test]
async fn test_views_work_without_shared_channel() {
    let groups = Groups::with(vec![("G1", vec!["a.png"])]);
    let mut dashboard = DashboardSync::new(SyncPeer::connect(None));
    let mut preview = PreviewSync::mount(SyncPeer::detached());

    // Local behavior is unaffected
    assert!(dashboard
        .select_group(Some(group("G1")), &groups)
        .await
        .is_some());
    assert_eq!(dashboard.drain(), 0);
    assert!(!dashboard.toggle_preview());

    preview.on_group_selected(Some(group("G1")), &groups).await;
    assert_eq!(shown(&preview), Some("G1"));
    assert_eq!(preview.drain(&groups).await, 0);
}
