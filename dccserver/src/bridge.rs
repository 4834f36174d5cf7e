//! Interface offerte aux collaborateurs externes (interface graphique, console).
//!
//! Les actions de contrôle renvoient des valeurs simples ; `ready` et `exit`
//! sont transmis au propriétaire du processus sous forme d'événements.

use crate::control::ServerSnapshot;
use crate::server::ServerLifecycleManager;
use dccutils::{PlatformOps, ShutdownError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Événements destinés au propriétaire du processus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// L'interface est prête
    Ready,
    /// Demande de fin du processus avec ce code
    Exit(i32),
}

/// Pont entre les collaborateurs et le serveur de contrôle
#[derive(Clone)]
pub struct ControlBridge {
    manager: Arc<ServerLifecycleManager>,
    ops: Arc<dyn PlatformOps>,
    events: mpsc::UnboundedSender<BridgeEvent>,
}

impl ControlBridge {
    pub fn new(
        manager: Arc<ServerLifecycleManager>,
        ops: Arc<dyn PlatformOps>,
    ) -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                manager,
                ops,
                events,
            },
            receiver,
        )
    }

    pub fn manager(&self) -> &Arc<ServerLifecycleManager> {
        &self.manager
    }

    /// `true` si le serveur tourne à l'issue de l'appel
    pub async fn server_start(&self) -> bool {
        match self.manager.start().await {
            Ok(_) => true,
            Err(e) => {
                error!("❌ Failed to start control server: {}", e);
                false
            }
        }
    }

    /// `false` si le serveur ne tournait pas
    pub async fn server_stop(&self) -> bool {
        self.manager.stop().await
    }

    pub async fn server_info(&self) -> ServerSnapshot {
        self.manager.info().await
    }

    /// Arrête l'hôte, indépendamment du serveur HTTP.
    pub async fn system_shutdown(&self) -> Result<String, ShutdownError> {
        self.ops.shutdown_host().await
    }

    pub fn notify_ready(&self) {
        info!("✅ User interface ready");
        self.send(BridgeEvent::Ready);
    }

    pub fn exit(&self, code: i32) {
        info!("👋 Exit requested with code {}", code);
        self.send(BridgeEvent::Exit(code));
    }

    fn send(&self, event: BridgeEvent) {
        if self.events.send(event).is_err() {
            warn!("❌ No process owner is listening for bridge events");
        }
    }
}
