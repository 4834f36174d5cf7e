//! Capacités dépendantes du système d'exploitation.
//!
//! La plateforme est détectée une seule fois au démarrage puis manipulée à
//! travers le trait [`PlatformOps`], ce qui évite de disperser des `cfg!`
//! dans le code réseau et permet d'injecter des implémentations de test.

use crate::errors::{IdentityError, ShutdownError};
use crate::ip_utils::{
    LoopbackFallback, NetworkIdentity, query_dhcp_addresses, resolve_from_interfaces,
    select_dhcp_address,
};
use async_trait::async_trait;
use std::fmt;
use tracing::{info, warn};

/// Système d'exploitation hôte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Other(String),
}

impl Platform {
    /// Plateforme de compilation courante
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "macos" => Platform::MacOs,
            "linux" => Platform::Linux,
            other => Platform::Other(other.to_string()),
        }
    }

    /// Commande native d'arrêt immédiat de l'hôte, sans confirmation.
    ///
    /// # Errors
    ///
    /// `UnsupportedPlatform` si aucune commande n'est connue pour cette plateforme.
    pub fn shutdown_command(&self) -> Result<ShutdownCommand, ShutdownError> {
        match self {
            Platform::Windows => Ok(ShutdownCommand::new("shutdown", &["/s", "/f", "/t", "0"])),
            Platform::MacOs => Ok(ShutdownCommand::new(
                "osascript",
                &["-e", "tell app \"System Events\" to shut down"],
            )),
            Platform::Linux => Ok(ShutdownCommand::new("shutdown", &["-h", "now"])),
            Platform::Other(name) => Err(ShutdownError::UnsupportedPlatform(name.clone())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::MacOs => write!(f, "macos"),
            Platform::Linux => write!(f, "linux"),
            Platform::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Programme et arguments d'une commande système
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ShutdownCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Exécute la commande et retourne stdout (ou stderr si stdout est vide).
    pub async fn run(&self) -> Result<String, ShutdownError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|source| ShutdownError::Spawn {
                command: self.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ShutdownError::CommandFailed {
                command: self.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            Ok(String::from_utf8_lossy(&output.stderr).trim().to_string())
        } else {
            Ok(stdout)
        }
    }
}

impl fmt::Display for ShutdownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Opérations système dont dépend le plan de contrôle.
///
/// `SystemPlatform` est l'implémentation réelle ; les tests fournissent des
/// implémentations qui enregistrent les appels.
#[async_trait]
pub trait PlatformOps: Send + Sync {
    /// Plateforme servie par cette implémentation
    fn platform(&self) -> Platform;

    /// Résout l'adresse IPv4 routable de l'hôte (jamais mise en cache).
    async fn resolve_address(&self) -> Result<NetworkIdentity, IdentityError>;

    /// Commande d'arrêt associée à la plateforme
    fn shutdown_command(&self) -> Result<ShutdownCommand, ShutdownError> {
        self.platform().shutdown_command()
    }

    /// Arrête l'hôte. Action irréversible, indépendante du serveur HTTP.
    async fn shutdown_host(&self) -> Result<String, ShutdownError> {
        let command = self.shutdown_command()?;
        warn!("🛑 Shutting down the host: {}", command);
        command.run().await
    }
}

/// Implémentation de [`PlatformOps`] pour la machine courante
#[derive(Debug, Clone)]
pub struct SystemPlatform {
    platform: Platform,
    loopback_fallback: LoopbackFallback,
}

impl SystemPlatform {
    pub fn new(platform: Platform, loopback_fallback: LoopbackFallback) -> Self {
        Self {
            platform,
            loopback_fallback,
        }
    }

    /// Détecte la plateforme courante
    pub fn detect(loopback_fallback: LoopbackFallback) -> Self {
        let platform = Platform::current();
        info!(%platform, ?loopback_fallback, "Platform detected");
        Self::new(platform, loopback_fallback)
    }
}

#[async_trait]
impl PlatformOps for SystemPlatform {
    fn platform(&self) -> Platform {
        self.platform.clone()
    }

    async fn resolve_address(&self) -> Result<NetworkIdentity, IdentityError> {
        match self.platform {
            Platform::Windows => {
                let candidates = query_dhcp_addresses().await;
                select_dhcp_address(&candidates, self.loopback_fallback)
            }
            _ => resolve_from_interfaces(),
        }
    }
}
