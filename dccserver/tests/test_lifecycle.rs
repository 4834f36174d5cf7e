//! Tests du cycle de vie : listener réel sur 127.0.0.1, port éphémère.

mod common;

use common::{BrokenAdvertiser, FakePlatform, ProbeAdvertiser, settings, web_root};
use dccserver::{ServerError, ServerLifecycleManager, StartOutcome};
use dccupnp::{Advertiser, AdvertiserState};
use dccutils::PlatformOps;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;

fn manager_with(
    root: &std::path::Path,
    ops: Arc<dyn PlatformOps>,
    advertiser: Box<dyn Advertiser>,
) -> ServerLifecycleManager {
    ServerLifecycleManager::new(Arc::new(settings(root)), ops, advertiser)
}

#[tokio::test]
async fn test_start_twice_keeps_one_listener() {
    let root = web_root();
    let manager = manager_with(
        root.path(),
        Arc::new(FakePlatform::default()),
        Box::new(ProbeAdvertiser::default()),
    );

    assert_eq!(manager.start().await.unwrap(), StartOutcome::Started);
    let first = manager.local_addr().await.unwrap();

    assert_eq!(manager.start().await.unwrap(), StartOutcome::AlreadyRunning);
    assert_eq!(manager.local_addr().await.unwrap(), first);

    assert!(manager.stop().await);
}

#[tokio::test]
async fn test_stop_when_not_running() {
    let root = web_root();
    let events = Arc::new(Mutex::new(Vec::new()));
    let manager = manager_with(
        root.path(),
        Arc::new(FakePlatform::default()),
        Box::new(ProbeAdvertiser::new(Arc::clone(&events))),
    );

    assert!(!manager.stop().await);
    assert!(events.lock().unwrap().is_empty());

    manager.start().await.unwrap();
    assert!(manager.stop().await);
    assert!(!manager.stop().await);
}

#[tokio::test]
async fn test_info_accuracy() {
    let root = web_root();
    let manager = manager_with(
        root.path(),
        Arc::new(FakePlatform::default()),
        Box::new(ProbeAdvertiser::default()),
    );

    let before = chrono::Utc::now().timestamp_millis();
    manager.start().await.unwrap();
    let after = chrono::Utc::now().timestamp_millis();

    let info = manager.info().await;
    assert!(info.is_running);
    assert!(info.started_at >= before && info.started_at <= after);
    assert_eq!(info.ip_address.as_deref(), Some("127.0.0.1"));
    assert_eq!(Some(info.port), manager.local_addr().await.map(|a| a.port()));
    assert!(!info.is_degraded());

    manager.stop().await;
    let info = manager.info().await;
    assert!(!info.is_running);
    assert_eq!(info.started_at, 0);
    assert_eq!(info.connections, 0);
}

#[tokio::test]
async fn test_advertiser_runs_inside_listener_lifetime() {
    let root = web_root();
    let events = Arc::new(Mutex::new(Vec::new()));
    let manager = manager_with(
        root.path(),
        Arc::new(FakePlatform::default()),
        Box::new(ProbeAdvertiser::new(Arc::clone(&events))),
    );

    manager.start().await.unwrap();
    assert_eq!(manager.advertiser_state().await, AdvertiserState::Advertising);
    let addr = manager.local_addr().await.unwrap();

    manager.stop().await;
    assert_eq!(manager.advertiser_state().await, AdvertiserState::Idle);

    assert_eq!(
        *events.lock().unwrap(),
        vec!["start:listening".to_string(), "stop:listening".to_string()]
    );
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_advertiser_failure_does_not_block_serving() {
    let root = web_root();
    let manager = manager_with(
        root.path(),
        Arc::new(FakePlatform::default()),
        Box::new(BrokenAdvertiser),
    );

    assert_eq!(manager.start().await.unwrap(), StartOutcome::Started);
    assert!(manager.info().await.is_running);
    assert!(manager.stop().await);
}

#[tokio::test]
async fn test_bind_failure_leaves_server_stopped() {
    let root = web_root();
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut settings = settings(root.path());
    settings.http_port = port;
    let manager = ServerLifecycleManager::new(
        Arc::new(settings),
        Arc::new(FakePlatform::default()),
        Box::new(ProbeAdvertiser::new(Arc::clone(&events))),
    );

    match manager.start().await {
        Err(ServerError::Bind { addr, .. }) => assert_eq!(addr.port(), port),
        other => panic!("expected Bind error, got {other:?}"),
    }
    assert!(!manager.is_running().await);
    assert!(!manager.info().await.is_running);
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_identity_failure_leaves_server_stopped() {
    let root = web_root();
    let manager = manager_with(
        root.path(),
        Arc::new(FakePlatform::failing()),
        Box::new(ProbeAdvertiser::default()),
    );

    assert!(matches!(
        manager.start().await,
        Err(ServerError::Identity(_))
    ));
    let info = manager.info().await;
    assert!(!info.is_running);
    assert_eq!(info.ip_address, None);
    assert_eq!(info.display_address(), dccserver::UI_PLACEHOLDER_ADDRESS);
}

#[tokio::test]
async fn test_stop_closes_open_connections() {
    let root = web_root();
    let manager = manager_with(
        root.path(),
        Arc::new(FakePlatform::default()),
        Box::new(ProbeAdvertiser::default()),
    );
    manager.start().await.unwrap();
    let addr = manager.local_addr().await.unwrap();

    let mut idle = tokio::net::TcpStream::connect(addr).await.unwrap();
    manager.stop().await;

    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(Duration::from_secs(2), idle.read(&mut buf))
        .await
        .expect("connection should be closed by stop()");
    assert!(matches!(read, Ok(0) | Err(_)));
}

#[tokio::test]
async fn test_info_over_http_then_stop() {
    let root = web_root();
    let manager = manager_with(
        root.path(),
        Arc::new(FakePlatform::default()),
        Box::new(ProbeAdvertiser::default()),
    );
    manager.start().await.unwrap();
    let addr = manager.local_addr().await.unwrap();

    let client = reqwest::Client::new();
    let value: serde_json::Value = client
        .get(format!("http://{addr}/api/info"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(value["status"], "ok");
    assert_eq!(value["data"]["isRunning"], true);
    let ip = value["data"]["ipAddress"].as_str().unwrap();
    assert!(ip.parse::<std::net::Ipv4Addr>().is_ok());
    assert_eq!(ip.split('.').count(), 4);

    assert!(manager.stop().await);
    assert!(
        client
            .get(format!("http://{addr}/api/info"))
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_err()
    );
    assert!(!manager.info().await.is_running);
}
