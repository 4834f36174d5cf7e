//! Résolution de l'adresse IPv4 routable de la machine.
//!
//! Deux stratégies coexistent :
//!
//! - **Énumération des interfaces** (POSIX) : première adresse IPv4 qui n'est
//!   pas une adresse de loopback.
//! - **Requête DHCP** (Windows) : l'énumération y remonte des adaptateurs
//!   virtuels, on interroge donc `Get-NetIPAddress` en ne gardant que les
//!   adresses obtenues par DHCP.
//!
//! L'adresse n'est jamais mise en cache : elle est recalculée à chaque appel
//! car un bail DHCP peut changer entre deux démarrages.

use crate::errors::IdentityError;
use get_if_addrs::get_if_addrs;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, warn};

/// Commande PowerShell listant les adresses IPv4 attribuées par DHCP.
const DHCP_QUERY: &str = "Get-NetIPAddress -AddressFamily IPv4 -PrefixOrigin Dhcp \
                          | Select-Object -ExpandProperty IPAddress";

/// Origine d'une adresse résolue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    /// Trouvée par énumération des interfaces réseau
    Interface,
    /// Attribuée par DHCP (requête native Windows)
    Dhcp,
    /// Aucune adresse DHCP : repli en mode dégradé sur `127.0.0.1`
    LoopbackFallback,
}

/// Adresse IPv4 de l'hôte, accompagnée de son origine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkIdentity {
    pub address: Ipv4Addr,
    pub source: AddressSource,
}

impl NetworkIdentity {
    pub fn new(address: Ipv4Addr, source: AddressSource) -> Self {
        Self { address, source }
    }

    /// Vrai quand l'adresse est le repli loopback et non une vraie adresse LAN
    pub fn is_degraded(&self) -> bool {
        self.source == AddressSource::LoopbackFallback
    }
}

impl fmt::Display for NetworkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// Politique appliquée quand la requête DHCP ne renvoie aucune adresse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackFallback {
    /// Se replier sur `127.0.0.1` (signalé dans les logs et par `AddressSource`)
    Allow,
    /// Échouer avec `NoAddressFound`
    Deny,
}

impl From<bool> for LoopbackFallback {
    fn from(allow: bool) -> Self {
        if allow {
            LoopbackFallback::Allow
        } else {
            LoopbackFallback::Deny
        }
    }
}

/// Retourne la première adresse IPv4 qui n'est pas une adresse de loopback.
pub fn first_routable_ipv4<I>(addresses: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    addresses.into_iter().find_map(|ip| match ip {
        IpAddr::V4(v4) if !v4.is_loopback() => Some(v4),
        _ => None,
    })
}

/// Résout l'adresse par énumération des interfaces réseau.
///
/// # Errors
///
/// `NoAddressFound` si aucune interface ne porte d'adresse IPv4 routable.
pub fn resolve_from_interfaces() -> Result<NetworkIdentity, IdentityError> {
    let interfaces = get_if_addrs()?;
    for iface in &interfaces {
        debug!(interface = %iface.name, ip = %iface.ip(), "Network interface");
    }

    first_routable_ipv4(interfaces.iter().map(|iface| iface.ip()))
        .map(|address| NetworkIdentity::new(address, AddressSource::Interface))
        .ok_or(IdentityError::NoAddressFound)
}

/// Extrait les adresses IPv4 d'une sortie texte (une adresse par ligne).
///
/// Les lignes vides, invalides ou de loopback sont ignorées.
pub fn parse_address_list(output: &str) -> Vec<Ipv4Addr> {
    output
        .lines()
        .filter_map(|line| line.trim().parse::<Ipv4Addr>().ok())
        .filter(|ip| !ip.is_loopback())
        .collect()
}

/// Choisit l'adresse DHCP à utiliser en appliquant la politique de repli.
pub fn select_dhcp_address(
    candidates: &[Ipv4Addr],
    fallback: LoopbackFallback,
) -> Result<NetworkIdentity, IdentityError> {
    if let Some(address) = candidates.first() {
        return Ok(NetworkIdentity::new(*address, AddressSource::Dhcp));
    }

    match fallback {
        LoopbackFallback::Allow => {
            warn!("⚠️ No DHCP address found, falling back to 127.0.0.1 (degraded mode)");
            Ok(NetworkIdentity::new(
                Ipv4Addr::LOCALHOST,
                AddressSource::LoopbackFallback,
            ))
        }
        LoopbackFallback::Deny => Err(IdentityError::NoAddressFound),
    }
}

/// Interroge PowerShell pour obtenir les adresses IPv4 attribuées par DHCP.
///
/// Un échec de la commande est traité comme une liste vide.
pub async fn query_dhcp_addresses() -> Vec<Ipv4Addr> {
    let output = tokio::process::Command::new("powershell")
        .args(["-NoProfile", "-NonInteractive", "-Command", DHCP_QUERY])
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => parse_address_list(&String::from_utf8_lossy(&out.stdout)),
        Ok(out) => {
            warn!(
                status = %out.status,
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "DHCP address query failed"
            );
            Vec::new()
        }
        Err(e) => {
            warn!("❌ Failed to run DHCP address query: {}", e);
            Vec::new()
        }
    }
}
