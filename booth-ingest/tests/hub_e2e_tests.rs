//! End-to-end tests over a real socket
//!
//! Tests cover:
//! - SET_ACTIVE_GROUP from one client, FILE_MOVED fanned out to all clients
//! - Deferred SET_ACTIVE_GROUP sent exactly once the link opens (last call wins)
//! - Hub delivery contract shared with cross-tab sync

use booth_common::channel::contract;
use booth_common::hub_client::{HubClient, LinkState};
use booth_common::{GroupId, HubEvent};
use booth_ingest::groups::{GroupStore, StorageLayout};
use booth_ingest::hub::Hub;
use booth_ingest::register::RegisterHandle;
use booth_ingest::relocate::Relocator;
use booth_ingest::watcher::IngestWatcher;
use booth_ingest::watermark::Watermarker;
use booth_ingest::{build_router, AppState};
use futures::StreamExt;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::TempDir;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

struct Server {
    _dir: TempDir,
    addr: SocketAddr,
    layout: StorageLayout,
    register: RegisterHandle,
    hub: Hub,
}

impl Server {
    fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Connect a client and wait until the hub counts it as open
    async fn client(&self) -> HubClient {
        let expected = self.hub.open_count() + 1;
        let mut client = HubClient::connect(self.url());
        assert_eq!(client.wait_until_settled().await, LinkState::Open);
        let hub = self.hub.clone();
        eventually(move || {
            let hub = hub.clone();
            async move { hub.open_count() == expected }
        })
        .await;
        client
    }
}

/// Test helper: serve the full router on an ephemeral port
async fn start_server() -> Server {
    let dir = TempDir::new().unwrap();
    let layout = StorageLayout::new(dir.path());
    layout.ensure_directories().unwrap();

    let register = RegisterHandle::spawn();
    let hub = Hub::new(register.clone(), 16);
    let app = build_router(AppState::new(hub.clone(), GroupStore::new(layout.clone())));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server {
        _dir: dir,
        addr,
        layout,
        register,
        hub,
    }
}

/// Poll `check` until it holds or the wait expires
async fn eventually<F, Fut>(check: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(WAIT, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition should hold within timeout");
}

async fn wait_for_active(register: &RegisterHandle, expected: Option<GroupId>) {
    let mut current = register.subscribe();
    tokio::time::timeout(WAIT, current.wait_for(|g| *g == expected))
        .await
        .expect("register should update within timeout")
        .unwrap();
}

fn group(id: &str) -> GroupId {
    GroupId::new(id).unwrap()
}

#[tokio::test]
async fn test_capture_announced_to_every_client() {
    let server = start_server().await;
    let mut booth = server.client().await;
    let mut viewer = server.client().await;

    booth.set_active_group(Some(group("G1")));
    wait_for_active(&server.register, Some(group("G1"))).await;

    let cancel = CancellationToken::new();
    let overlay = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 255, 255]));
    let watcher = IngestWatcher::new(
        Relocator::new(server.layout.clone(), Watermarker::from_image(overlay)),
        server.register.clone(),
        server.hub.clone(),
        Duration::from_millis(50),
    )
    .spawn(cancel.clone())
    .unwrap();

    // Write hidden, then rename into place
    let landing = server.layout.landing_zone();
    let staging = landing.join(".incoming.jpg");
    RgbImage::from_pixel(320, 240, Rgb([200, 200, 200]))
        .save_with_format(&staging, image::ImageFormat::Jpeg)
        .unwrap();
    std::fs::rename(&staging, landing.join("capture.jpg")).unwrap();

    let expected = HubEvent::FileMoved {
        file_name: "capture.jpg".to_string(),
        group_id: group("G1"),
    };
    for client in [&mut booth, &mut viewer] {
        let event = tokio::time::timeout(WAIT, client.recv())
            .await
            .expect("FILE_MOVED within timeout");
        assert_eq!(event, Some(expected.clone()));
    }

    // Exactly one announcement per capture
    assert!(tokio::time::timeout(Duration::from_millis(300), viewer.recv())
        .await
        .is_err());

    assert!(server
        .layout
        .draft_dir(&group("G1"))
        .join("capture.jpg")
        .exists());
    assert!(!landing.join("capture.jpg").exists());

    cancel.cancel();
    watcher.await.unwrap();
}

#[tokio::test]
async fn test_set_before_open_is_deferred() {
    let server = start_server().await;

    let mut client = HubClient::connect(server.url());
    assert_eq!(client.state(), LinkState::Connecting);
    client.set_active_group(Some(group("G1")));
    client.set_active_group(Some(group("G2")));

    assert_eq!(client.wait_until_settled().await, LinkState::Open);
    wait_for_active(&server.register, Some(group("G2"))).await;
}

#[tokio::test]
async fn test_deferred_set_sent_exactly_once() {
    // Bare WebSocket endpoint that records every text frame it receives
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorder = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut frames = Vec::new();
        while let Some(Ok(message)) = socket.next().await {
            if let Message::Text(text) = message {
                frames.push(HubEvent::from_frame(&text).unwrap());
            }
        }
        frames
    });

    let mut client = HubClient::connect(format!("ws://{addr}/ws"));
    client.set_active_group(Some(group("G1")));
    client.set_active_group(Some(group("G2")));
    assert_eq!(client.wait_until_settled().await, LinkState::Open);

    tokio::time::sleep(Duration::from_millis(200)).await;
    drop(client);

    let frames = tokio::time::timeout(WAIT, recorder)
        .await
        .expect("recorder should finish once the client closes")
        .unwrap();
    assert_eq!(
        frames,
        vec![HubEvent::SetActiveGroup {
            group_id: Some(group("G2")),
        }]
    );
}

#[tokio::test]
async fn test_deferred_set_applied_once_by_hub() {
    let server = start_server().await;
    // Fresh register: nothing written yet, so the first change is the client's
    let mut changes = server.register.subscribe();

    let mut client = HubClient::connect(server.url());
    client.set_active_group(Some(group("G1")));
    client.set_active_group(Some(group("G2")));
    assert_eq!(client.wait_until_settled().await, LinkState::Open);

    tokio::time::timeout(WAIT, changes.changed())
        .await
        .expect("register should change")
        .unwrap();
    assert_eq!(*changes.borrow_and_update(), Some(group("G2")));

    // No second write follows
    assert!(
        tokio::time::timeout(Duration::from_millis(300), changes.changed())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_clearing_active_group() {
    let server = start_server().await;
    let client = server.client().await;

    client.set_active_group(Some(group("G1")));
    wait_for_active(&server.register, Some(group("G1"))).await;

    client.set_active_group(None);
    wait_for_active(&server.register, None).await;
}

#[tokio::test]
async fn test_disconnected_client_pruned() {
    let server = start_server().await;
    let mut kept = server.client().await;
    let dropped = server.client().await;
    drop(dropped);

    let hub = server.hub.clone();
    eventually(move || {
        let hub = hub.clone();
        async move { hub.open_count() == 1 }
    })
    .await;

    let event = HubEvent::FileMoved {
        file_name: "x.png".to_string(),
        group_id: group("G1"),
    };
    assert_eq!(server.hub.broadcast(&event), 1);
    let received = tokio::time::timeout(WAIT, kept.recv()).await.unwrap();
    assert_eq!(received, Some(event));
}

#[tokio::test]
async fn test_hub_delivery_contract() {
    let server = start_server().await;
    let mut clients = vec![server.client().await, server.client().await];

    contract::delivers_to_every_subscriber(
        &server.hub,
        &mut clients,
        HubEvent::FileMoved {
            file_name: "one.png".to_string(),
            group_id: group("G1"),
        },
    )
    .await;

    let messages = (0..5)
        .map(|i| HubEvent::FileMoved {
            file_name: format!("{i}.png"),
            group_id: group("G1"),
        })
        .collect();
    contract::preserves_publish_order(&server.hub, &mut clients[0], messages).await;
}
