//! Serveur SSDP

use super::{
    Advertiser, AdvertiserState, SSDP_MULTICAST_ADDR, SSDP_PORT, SearchRequest, SsdpDevice,
};
use crate::description::DeviceDescription;
use crate::errors::SsdpError;
use async_trait::async_trait;
use dccutils::get_os_string;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Session d'annonce active : socket, device annoncé et tâches de fond
struct Session {
    device: Arc<SsdpDevice>,
    socket: Arc<UdpSocket>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Serveur SSDP gérant les annonces et découvertes
pub struct SsdpServer {
    uuid: String,
    device_type: String,
    service_type: String,
    server: String,
    announce_interval: Duration,
    port: u16,
    state: AdvertiserState,
    session: Option<Session>,
}

impl SsdpServer {
    /// Crée un serveur SSDP pour le device décrit, sans ouvrir de socket.
    pub fn new(description: &DeviceDescription, announce_interval: Duration) -> Self {
        Self {
            uuid: description.uuid.clone(),
            device_type: description.device_type.clone(),
            service_type: description.service_type.clone(),
            server: format!(
                "{} UPnP/1.1 DesktopControl/{}",
                get_os_string(),
                env!("CARGO_PKG_VERSION")
            ),
            announce_interval,
            port: SSDP_PORT,
            state: AdvertiserState::Idle,
            session: None,
        }
    }

    /// Change le port UDP d'écoute (1900 par défaut)
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Ouvre la socket multicast sur l'interface `interface`.
    fn open_socket(interface: Ipv4Addr, port: u16) -> std::io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)).into())?;
        socket.join_multicast_v4(&SSDP_MULTICAST_ADDR, &interface)?;
        socket.set_multicast_if_v4(&interface)?;
        socket.set_multicast_ttl_v4(2)?;
        socket.set_multicast_loop_v4(false)?;
        socket.set_nonblocking(true)?;
        UdpSocket::from_std(socket.into())
    }

    fn multicast_target() -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(SSDP_MULTICAST_ADDR, SSDP_PORT))
    }

    async fn send_alive(socket: &UdpSocket, device: &SsdpDevice, nt: &str) {
        let msg = device.alive_message(nt);
        match socket.send_to(msg.as_bytes(), Self::multicast_target()).await {
            Ok(_) => debug!("✅ NOTIFY alive: {} (NT={})", device.usn(nt), nt),
            Err(e) => warn!("❌ Failed to send NOTIFY alive for {}: {}", device.usn(nt), e),
        }
    }

    async fn send_byebye(socket: &UdpSocket, device: &SsdpDevice, nt: &str) {
        let msg = device.byebye_message(nt);
        match socket.send_to(msg.as_bytes(), Self::multicast_target()).await {
            Ok(_) => info!("👋 NOTIFY byebye: {} (NT={})", device.usn(nt), nt),
            Err(e) => warn!("❌ Failed to send NOTIFY byebye for {}: {}", device.usn(nt), e),
        }
    }

    /// Annonces périodiques, la première après une période complète.
    fn spawn_announcer(
        socket: Arc<UdpSocket>,
        device: Arc<SsdpDevice>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        for nt in device.notification_types() {
                            Self::send_alive(&socket, &device, nt).await;
                        }
                    }
                }
            }
        })
    }

    /// Écoute des M-SEARCH
    fn spawn_listener(
        socket: Arc<UdpSocket>,
        device: Arc<SsdpDevice>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buf = vec![0u8; 8192];
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = socket.recv_from(&mut buf) => match received {
                        Ok((n, src)) => {
                            let data = String::from_utf8_lossy(&buf[..n]);
                            if let Some(request) = SearchRequest::parse(&data) {
                                Self::handle_msearch(&socket, &device, src, request, &cancel);
                            }
                        }
                        Err(e) => warn!("❌ SSDP read error: {}", e),
                    }
                }
            }
        })
    }

    /// Planifie la réponse à un M-SEARCH après le délai tiré dans `[0, MX]`.
    fn handle_msearch(
        socket: &Arc<UdpSocket>,
        device: &Arc<SsdpDevice>,
        src: SocketAddr,
        request: SearchRequest,
        cancel: &CancellationToken,
    ) {
        let targets = device.matching_targets(&request.search_target);
        if targets.is_empty() {
            return;
        }
        debug!("✅ M-SEARCH received from {} with ST={}", src, request.search_target);

        let delay = request.response_delay();
        let socket = Arc::clone(socket);
        let device = Arc::clone(device);
        let cancel = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let date = chrono::Utc::now()
                .format("%a, %d %b %Y %H:%M:%S GMT")
                .to_string();
            for nt in targets {
                let resp = device.search_response(&nt, &date);
                match socket.send_to(resp.as_bytes(), src).await {
                    Ok(_) => info!("📡 M-SEARCH response sent to {} with ST={}", src, nt),
                    Err(e) => warn!("❌ Failed to send M-SEARCH response to {}: {}", src, e),
                }
            }
        });
    }
}

#[async_trait]
impl Advertiser for SsdpServer {
    async fn start(&mut self, address: Ipv4Addr, port: u16) -> Result<(), SsdpError> {
        if self.session.is_some() {
            self.stop().await;
        }
        self.state = AdvertiserState::Starting;

        let socket = match Self::open_socket(address, self.port) {
            Ok(socket) => Arc::new(socket),
            Err(source) => {
                self.state = AdvertiserState::Idle;
                return Err(SsdpError::AdvertiseStart { address, source });
            }
        };

        let device = Arc::new(SsdpDevice::new(
            self.uuid.clone(),
            self.device_type.clone(),
            self.service_type.clone(),
            DeviceDescription::location(address, port),
            self.server.clone(),
        ));

        for nt in device.notification_types() {
            Self::send_alive(&socket, &device, nt).await;
        }

        let cancel = CancellationToken::new();
        let tasks = vec![
            Self::spawn_announcer(
                Arc::clone(&socket),
                Arc::clone(&device),
                self.announce_interval,
                cancel.clone(),
            ),
            Self::spawn_listener(Arc::clone(&socket), Arc::clone(&device), cancel.clone()),
        ];

        info!(
            "✅ SSDP advertising {} on {} (udp port {})",
            device.location, address, self.port
        );

        self.session = Some(Session {
            device,
            socket,
            cancel,
            tasks,
        });
        self.state = AdvertiserState::Advertising;
        Ok(())
    }

    async fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.state = AdvertiserState::Stopping;

        session.cancel.cancel();
        for task in session.tasks {
            if let Err(e) = task.await {
                warn!("❌ SSDP task ended abnormally: {}", e);
            }
        }

        for nt in session.device.notification_types() {
            Self::send_byebye(&session.socket, &session.device, nt).await;
        }

        drop(session.socket);
        self.state = AdvertiserState::Idle;
        info!("✅ SSDP advertising stopped");
    }

    fn state(&self) -> AdvertiserState {
        self.state
    }
}

impl Drop for SsdpServer {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            for nt in session.device.notification_types() {
                let msg = session.device.byebye_message(nt);
                if let Err(e) = session
                    .socket
                    .try_send_to(msg.as_bytes(), Self::multicast_target())
                {
                    warn!("❌ Failed to send NOTIFY byebye on drop: {}", e);
                }
            }
        }
    }
}
