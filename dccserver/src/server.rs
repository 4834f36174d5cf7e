//! # Cycle de vie du serveur de contrôle
//!
//! [`ServerLifecycleManager`] possède l'unique listener HTTP et l'annonceur
//! SSDP. Toutes les transitions passent par un même verrou :
//!
//! - démarrage : résolution de l'adresse → bind → date de démarrage →
//!   annonce SSDP (best-effort)
//! - arrêt : fin des annonces → fermeture forcée des connexions → fermeture
//!   du listener

use crate::config_ext::ServerSettings;
use crate::control::ServerSnapshot;
use crate::errors::ServerError;
use crate::router::{RequestContext, build_router};
use axum_server::Handle;
use dccupnp::{Advertiser, AdvertiserState};
use dccutils::{PlatformOps, TransportProtocol, find_process_using_port};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Résultat d'un `start()` réussi
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Un nouveau listener a été lié
    Started,
    /// Le serveur tournait déjà, rien n'a été fait
    AlreadyRunning,
}

/// Listener actif et ce qu'il faut pour l'arrêter
struct RunningServer {
    ctx: Arc<RequestContext>,
    local_addr: SocketAddr,
    handle: Handle,
    task: JoinHandle<std::io::Result<()>>,
}

struct Inner {
    running: Option<RunningServer>,
    advertiser: Box<dyn Advertiser>,
}

/// Contrôleur unique du listener HTTP et de l'annonceur
pub struct ServerLifecycleManager {
    settings: Arc<ServerSettings>,
    ops: Arc<dyn PlatformOps>,
    inner: Mutex<Inner>,
}

impl ServerLifecycleManager {
    pub fn new(
        settings: Arc<ServerSettings>,
        ops: Arc<dyn PlatformOps>,
        advertiser: Box<dyn Advertiser>,
    ) -> Self {
        Self {
            settings,
            ops,
            inner: Mutex::new(Inner {
                running: None,
                advertiser,
            }),
        }
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Démarre le serveur s'il ne tourne pas déjà.
    ///
    /// # Errors
    ///
    /// `Identity` si aucune adresse n'est disponible, `Bind` si le port ou
    /// l'adresse est indisponible. Dans les deux cas aucun listener ne reste
    /// ouvert.
    pub async fn start(&self) -> Result<StartOutcome, ServerError> {
        let mut inner = self.inner.lock().await;
        if let Some(running) = &inner.running {
            if !running.task.is_finished() {
                debug!("Control server already running on {}", running.local_addr);
                return Ok(StartOutcome::AlreadyRunning);
            }
        }
        if let Some(stale) = inner.running.take() {
            warn!(
                "❌ Control server on {} ended unexpectedly, binding again",
                stale.local_addr
            );
            stale.ctx.live.store(false, Ordering::SeqCst);
            inner.advertiser.stop().await;
        }

        let identity = self.ops.resolve_address().await?;
        if identity.is_degraded() {
            warn!(
                "⚠️ No DHCP address found, serving on loopback {} (LAN clients cannot reach it)",
                identity.address
            );
        }

        let requested = SocketAddr::from((identity.address, self.settings.http_port));
        let bind_error = |source: std::io::Error| ServerError::Bind {
            addr: requested,
            source,
        };

        let listener = match TcpListener::bind(requested).await {
            Ok(listener) => listener,
            Err(source) => {
                self.report_port_owner(&source).await;
                return Err(bind_error(source));
            }
        };
        let local_addr = listener.local_addr().map_err(bind_error)?;
        let std_listener = listener.into_std().map_err(bind_error)?;
        let started_at = chrono::Utc::now().timestamp_millis();

        let handle = Handle::new();
        let ctx = Arc::new(
            RequestContext::new(
                identity.address,
                local_addr.port(),
                started_at,
                handle.clone(),
                Arc::clone(&self.ops),
                Arc::clone(&self.settings),
            )
            .map_err(ServerError::ProxyClient)?,
        );

        let router = build_router(Arc::clone(&ctx));
        let server = axum_server::from_tcp(std_listener).handle(handle.clone());
        let task = tokio::spawn(async move { server.serve(router.into_make_service()).await });

        info!(
            "✅ Control server listening on http://{} ({} mode)",
            local_addr,
            if self.settings.mode.is_development() {
                "development"
            } else {
                "production"
            }
        );

        if let Err(e) = inner
            .advertiser
            .start(identity.address, local_addr.port())
            .await
        {
            warn!("❌ {} (discovery disabled, control API still available)", e);
        }

        inner.running = Some(RunningServer {
            ctx,
            local_addr,
            handle,
            task,
        });
        Ok(StartOutcome::Started)
    }

    /// Arrête le serveur. Retourne `false` s'il ne tournait pas.
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(running) = inner.running.take() else {
            debug!("Control server not running, nothing to stop");
            return false;
        };

        running.ctx.live.store(false, Ordering::SeqCst);
        inner.advertiser.stop().await;

        let open = running.handle.connection_count();
        running.handle.shutdown();
        match running.task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("❌ Control server ended with an error: {}", e),
            Err(e) => warn!("❌ Control server task failed: {}", e),
        }

        info!(
            "👋 Control server on {} stopped ({} connection(s) closed)",
            running.local_addr, open
        );
        true
    }

    /// Photographie de l'état courant, adresse résolue à l'appel.
    pub async fn info(&self) -> ServerSnapshot {
        let current = {
            let inner = self.inner.lock().await;
            inner.running.as_ref().map(|running| {
                (
                    running.ctx.port,
                    running.handle.connection_count(),
                    running.ctx.started_at,
                    !running.task.is_finished(),
                )
            })
        };

        let (ip_address, address_source) = match self.ops.resolve_address().await {
            Ok(identity) => (Some(identity.address.to_string()), Some(identity.source)),
            Err(e) => {
                debug!("Address resolution failed: {}", e);
                (None, None)
            }
        };

        match current {
            Some((port, connections, started_at, is_running)) => ServerSnapshot {
                ip_address,
                port,
                connections,
                started_at: if is_running { started_at } else { 0 },
                is_running,
                address_source,
            },
            None => ServerSnapshot {
                ip_address,
                port: self.settings.http_port,
                connections: 0,
                started_at: 0,
                is_running: false,
                address_source,
            },
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .lock()
            .await
            .running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Adresse effectivement liée (utile avec le port 0)
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.inner
            .lock()
            .await
            .running
            .as_ref()
            .map(|running| running.local_addr)
    }

    pub async fn advertiser_state(&self) -> AdvertiserState {
        self.inner.lock().await.advertiser.state()
    }

    /// Journalise le processus qui occupe le port demandé, si on le trouve.
    async fn report_port_owner(&self, error: &std::io::Error) {
        let port = self.settings.http_port;
        if error.kind() != std::io::ErrorKind::AddrInUse || port == 0 {
            return;
        }

        let owner = tokio::task::spawn_blocking(move || {
            find_process_using_port(port, TransportProtocol::Tcp)
        })
        .await
        .ok()
        .flatten();

        match owner {
            Some(info) => warn!("❌ Port {} is already used by {}", port, info),
            None => warn!("❌ Port {} is already in use", port),
        }
    }
}
