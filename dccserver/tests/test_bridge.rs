mod common;

use common::{FakePlatform, ProbeAdvertiser, settings, web_root};
use dccserver::{BridgeEvent, ControlBridge, ServerLifecycleManager};
use dccutils::PlatformOps;
use std::sync::Arc;

fn bridge_with(
    root: &std::path::Path,
    ops: Arc<FakePlatform>,
) -> (ControlBridge, tokio::sync::mpsc::UnboundedReceiver<BridgeEvent>) {
    let ops: Arc<dyn PlatformOps> = ops;
    let manager = Arc::new(ServerLifecycleManager::new(
        Arc::new(settings(root)),
        Arc::clone(&ops),
        Box::new(ProbeAdvertiser::default()),
    ));
    ControlBridge::new(manager, ops)
}

#[tokio::test]
async fn test_ready_and_exit_events() {
    let root = web_root();
    let (bridge, mut events) = bridge_with(root.path(), Arc::new(FakePlatform::default()));

    bridge.notify_ready();
    bridge.exit(3);

    assert_eq!(events.recv().await, Some(BridgeEvent::Ready));
    assert_eq!(events.recv().await, Some(BridgeEvent::Exit(3)));
}

#[tokio::test]
async fn test_start_stop_info_through_bridge() {
    let root = web_root();
    let (bridge, _events) = bridge_with(root.path(), Arc::new(FakePlatform::default()));

    assert!(!bridge.server_stop().await);
    assert!(bridge.server_start().await);
    assert!(bridge.server_start().await);
    assert!(bridge.server_info().await.is_running);
    assert!(bridge.server_stop().await);
    assert!(!bridge.server_info().await.is_running);
}

#[tokio::test]
async fn test_start_failure_maps_to_false() {
    let root = web_root();
    let (bridge, _events) = bridge_with(root.path(), Arc::new(FakePlatform::failing()));

    assert!(!bridge.server_start().await);
    assert!(!bridge.manager().is_running().await);
}

#[tokio::test]
async fn test_system_shutdown_is_independent_of_server() {
    let root = web_root();
    let ops = Arc::new(FakePlatform::default());
    let (bridge, _events) = bridge_with(root.path(), Arc::clone(&ops));

    assert_eq!(bridge.system_shutdown().await.unwrap(), "recorded");
    assert_eq!(ops.shutdown_count(), 1);
    assert!(!bridge.manager().is_running().await);
}
