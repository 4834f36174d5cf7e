//! Implémentations de test partagées par les tests d'intégration

#![allow(dead_code)]

use async_trait::async_trait;
use dccupnp::{Advertiser, AdvertiserState, DeviceDescription, SsdpError};
use dccutils::{
    AddressSource, IdentityError, NetworkIdentity, Platform, PlatformOps, ShutdownError,
};
use dccserver::ServerSettings;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Plateforme qui répond 127.0.0.1 et enregistre les demandes d'arrêt
#[derive(Default)]
pub struct FakePlatform {
    pub fail_resolution: bool,
    pub shutdowns: AtomicUsize,
}

impl FakePlatform {
    pub fn failing() -> Self {
        Self {
            fail_resolution: true,
            ..Self::default()
        }
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformOps for FakePlatform {
    fn platform(&self) -> Platform {
        Platform::Other("test".to_string())
    }

    async fn resolve_address(&self) -> Result<NetworkIdentity, IdentityError> {
        if self.fail_resolution {
            Err(IdentityError::NoAddressFound)
        } else {
            Ok(NetworkIdentity::new(Ipv4Addr::LOCALHOST, AddressSource::Interface))
        }
    }

    async fn shutdown_host(&self) -> Result<String, ShutdownError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok("recorded".to_string())
    }
}

/// Annonceur qui tente une connexion TCP au listener à chaque transition
#[derive(Default)]
pub struct ProbeAdvertiser {
    pub events: Arc<Mutex<Vec<String>>>,
    port: Option<u16>,
}

impl ProbeAdvertiser {
    pub fn new(events: Arc<Mutex<Vec<String>>>) -> Self {
        Self { events, port: None }
    }

    async fn probe(port: u16) -> &'static str {
        match tokio::net::TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await {
            Ok(_) => "listening",
            Err(_) => "closed",
        }
    }
}

#[async_trait]
impl Advertiser for ProbeAdvertiser {
    async fn start(&mut self, _address: Ipv4Addr, port: u16) -> Result<(), SsdpError> {
        let seen = Self::probe(port).await;
        self.events.lock().unwrap().push(format!("start:{seen}"));
        self.port = Some(port);
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(port) = self.port.take() {
            let seen = Self::probe(port).await;
            self.events.lock().unwrap().push(format!("stop:{seen}"));
        }
    }

    fn state(&self) -> AdvertiserState {
        if self.port.is_some() {
            AdvertiserState::Advertising
        } else {
            AdvertiserState::Idle
        }
    }
}

/// Annonceur qui échoue toujours au démarrage
pub struct BrokenAdvertiser;

#[async_trait]
impl Advertiser for BrokenAdvertiser {
    async fn start(&mut self, address: Ipv4Addr, _port: u16) -> Result<(), SsdpError> {
        Err(SsdpError::AdvertiseStart {
            address,
            source: std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no multicast"),
        })
    }

    async fn stop(&mut self) {}

    fn state(&self) -> AdvertiserState {
        AdvertiserState::Idle
    }
}

pub fn description() -> DeviceDescription {
    DeviceDescription {
        uuid: "5a1f0c2e-9d7b-4c1e-8f3a-0b6d2e4c8a10".to_string(),
        friendly_name: "Desktop Control Center".to_string(),
        manufacturer: "Desktop Control".to_string(),
        model_name: "Desktop Control Center".to_string(),
        device_type: "urn:schemas-desktop-control:device:ControlCenter:1".to_string(),
        service_type: "urn:schemas-desktop-control:service:ControlApi:1".to_string(),
    }
}

/// Réglages de production sur un port éphémère
pub fn settings(web_root: &Path) -> ServerSettings {
    let mut settings = ServerSettings::new(0, web_root, description());
    settings.shutdown_grace = Duration::from_millis(10);
    settings.proxy_timeout = Duration::from_secs(2);
    settings
}

/// Racine web minimale
pub fn web_root() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("index.html"),
        b"<!doctype html><div id=\"app\"></div>",
    )
    .unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/index.css"), b"body{margin:0}").unwrap();
    dir
}
