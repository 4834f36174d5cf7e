//! # Module SSDP - Simple Service Discovery Protocol
//!
//! Ce module annonce le centre de contrôle sur le réseau local pour qu'un
//! client mobile puisse le trouver sans saisir d'adresse.
//!
//! ## Fonctionnalités
//!
//! - ✅ Envoi de NOTIFY alive/byebye en multicast
//! - ✅ Réponse aux M-SEARCH en unicast, après un délai aléatoire borné par MX
//! - ✅ Annonces périodiques automatiques
//! - ✅ Arrêt propre avec byebye avant la libération de la socket
//!
//! ## Architecture
//!
//! - [`Advertiser`] : contrat de démarrage/arrêt piloté par le serveur HTTP
//! - [`SsdpServer`] : implémentation multicast réelle
//! - [`SsdpDevice`] : métadonnées et construction des messages
//! - [`SearchRequest`] : analyse d'un M-SEARCH reçu
//!
//! ## Constantes SSDP
//!
//! - **Multicast Address**: 239.255.255.250:1900
//! - **Max-Age**: 1800 secondes (30 minutes)
//! - **Announcement Period**: 900 secondes par défaut (Max-Age/2)

mod device;
mod search;
mod server;

pub use device::SsdpDevice;
pub use search::SearchRequest;
pub use server::SsdpServer;

use crate::errors::SsdpError;
use async_trait::async_trait;
use std::fmt;
use std::net::Ipv4Addr;

/// Adresse multicast SSDP
pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// Port SSDP
pub const SSDP_PORT: u16 = 1900;

/// Durée de validité des annonces (en secondes)
pub const MAX_AGE: u32 = 1800;

/// Borne haute du délai de réponse à un M-SEARCH (en secondes)
pub const MAX_MX_SECS: u64 = 5;

/// État de l'annonceur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiserState {
    Idle,
    Starting,
    Advertising,
    Stopping,
}

impl fmt::Display for AdvertiserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdvertiserState::Idle => "idle",
            AdvertiserState::Starting => "starting",
            AdvertiserState::Advertising => "advertising",
            AdvertiserState::Stopping => "stopping",
        };
        write!(f, "{}", name)
    }
}

/// Annonceur de présence synchronisé avec le serveur HTTP.
///
/// `start` n'est appelé qu'une fois le listener HTTP lié, `stop` toujours
/// avant sa fermeture.
#[async_trait]
pub trait Advertiser: Send {
    /// Commence à annoncer `http://{address}:{port}/description.xml`.
    ///
    /// En cas d'échec l'annonceur reste `Idle`.
    async fn start(&mut self, address: Ipv4Addr, port: u16) -> Result<(), SsdpError>;

    /// Cesse les annonces et envoie les byebye. Sans effet si `Idle`.
    async fn stop(&mut self);

    fn state(&self) -> AdvertiserState;
}
