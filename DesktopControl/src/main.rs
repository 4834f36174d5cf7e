mod console;

use dccconfig::get_config;
use dccserver::{
    BridgeEvent, ControlBridge, LoggingOptions, ServerLifecycleManager, ServerSettings,
    init_logging,
};
use dccupnp::{SsdpServer, UpnpConfigExt};
use dccutils::{PlatformOps, SystemPlatform};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Configuration et logs ==========
    let config = get_config();
    let log_handle = init_logging(LoggingOptions {
        min_level: config.get_log_min_level(),
        enable_console: config.get_log_enable_console(),
    });

    let ops: Arc<dyn PlatformOps> =
        Arc::new(SystemPlatform::detect(config.get_loopback_fallback().into()));
    let settings = Arc::new(ServerSettings::from_config(&config)?);
    info!(
        "📡 Device {} ({})",
        settings.description.friendly_name,
        settings.description.udn()
    );

    // ========== PHASE 2 : Serveur de contrôle ==========
    let advertiser = SsdpServer::new(&settings.description, config.get_upnp_announce_interval());
    let manager = Arc::new(ServerLifecycleManager::new(
        Arc::clone(&settings),
        Arc::clone(&ops),
        Box::new(advertiser),
    ));
    let (bridge, mut events) = ControlBridge::new(Arc::clone(&manager), ops);

    if config.get_autostart() {
        info!("🌐 Starting control server...");
        if bridge.server_start().await {
            let snapshot = bridge.server_info().await;
            info!(
                "✅ Desktop Control Center ready at http://{}:{}/",
                snapshot.display_address(),
                snapshot.port
            );
        }
    }

    // ========== PHASE 3 : Console et attente ==========
    tokio::spawn(console::run(bridge.clone(), log_handle));

    let code = tokio::select! {
        _ = ctrl_c() => {
            info!("Ctrl+C reçu, arrêt");
            0
        }
        code = wait_for_exit(&mut events) => code,
    };

    manager.stop().await;
    info!("👋 Bye");
    std::process::exit(code);
}

/// Attend Ctrl+C ; ne se termine jamais si le signal est indisponible
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("❌ Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Consomme les événements du pont jusqu'à une demande de sortie
async fn wait_for_exit(events: &mut UnboundedReceiver<BridgeEvent>) -> i32 {
    while let Some(event) = events.recv().await {
        match event {
            BridgeEvent::Ready => info!("✅ Interface signalled ready"),
            BridgeEvent::Exit(code) => return code,
        }
    }
    0
}
