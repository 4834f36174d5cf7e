//! # dccutils - Utilitaires système du plan de contrôle
//!
//! - [`ip_utils`] : résolution de l'adresse IPv4 routable de l'hôte
//! - [`platform`] : capacités dépendantes de l'OS ([`PlatformOps`])
//! - [`process`] : identification du processus qui occupe un port
//!
//! # Examples
//!
//! ```no_run
//! use dccutils::{LoopbackFallback, PlatformOps, SystemPlatform};
//!
//! # async fn example() -> Result<(), dccutils::IdentityError> {
//! let ops = SystemPlatform::detect(LoopbackFallback::Allow);
//! let identity = ops.resolve_address().await?;
//! println!("Adresse locale: {}", identity);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ip_utils;
pub mod platform;
pub mod process;

pub use errors::{IdentityError, ShutdownError};
pub use ip_utils::{AddressSource, LoopbackFallback, NetworkIdentity};
pub use platform::{Platform, PlatformOps, ShutdownCommand, SystemPlatform};
pub use process::{ProcessPortInfo, TransportProtocol, find_process_using_port};

/// Retourne une chaîne décrivant le système d'exploitation et sa version.
///
/// Utilise la crate `os_info` pour obtenir de manière portable et fiable
/// les informations sur le système d'exploitation courant.
///
/// # Format
/// - macOS: "macOS/15.1" ou "Mac OS/10.15.7"
/// - Linux: "Linux/6.5.0" ou "Ubuntu/22.04"
/// - Windows: "Windows/10.0.19045"
/// - Autre: "{OS}/Unknown"
pub fn get_os_string() -> String {
    let info = os_info::get();
    let os_type = format!("{:?}", info.os_type());

    let version = info.version();
    if version != &os_info::Version::Unknown {
        format!("{}/{}", os_type, version)
    } else {
        format!("{}/Unknown", os_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_string_has_two_parts() {
        let os = get_os_string();
        let mut parts = os.splitn(2, '/');
        assert!(!parts.next().unwrap().is_empty());
        assert!(!parts.next().unwrap().is_empty());
    }
}
