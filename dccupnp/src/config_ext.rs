//! Extension pour intégrer la configuration UPnP dans dccconfig
//!
//! Ce module fournit le trait `UpnpConfigExt` qui ajoute à
//! `dccconfig::Config` les clés `host.upnp.*` utilisées par la découverte et
//! le document de description.

use dccconfig::Config;
use std::time::Duration;

// Constantes par défaut pour les noms UPnP
const DEFAULT_FRIENDLY_NAME: &str = "Desktop Control Center";
const DEFAULT_MANUFACTURER: &str = "Desktop Control";
const DEFAULT_MODEL_NAME: &str = "Desktop Control Center";
const DEFAULT_DEVICE_TYPE: &str = "urn:schemas-desktop-control:device:ControlCenter:1";
const DEFAULT_SERVICE_TYPE: &str = "urn:schemas-desktop-control:service:ControlApi:1";
const DEFAULT_ANNOUNCE_INTERVAL_SECS: u64 = (crate::ssdp::MAX_AGE / 2) as u64;

/// Trait d'extension pour ajouter la configuration UPnP à dccconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use dccconfig::get_config;
/// use dccupnp::UpnpConfigExt;
///
/// let config = get_config();
/// let name = config.get_upnp_friendly_name();
/// ```
pub trait UpnpConfigExt {
    /// Nom convivial affiché par les clients (défaut: "Desktop Control Center")
    fn get_upnp_friendly_name(&self) -> String;

    /// Fabricant annoncé dans la description
    fn get_upnp_manufacturer(&self) -> String;

    /// Nom de modèle annoncé dans la description
    fn get_upnp_model_name(&self) -> String;

    /// Type de device (URN) annoncé en SSDP et dans la description
    fn get_upnp_device_type(&self) -> String;

    /// Type de service (URN) annoncé en SSDP
    fn get_upnp_service_type(&self) -> String;

    /// Période des annonces `ssdp:alive` (défaut: MAX_AGE / 2)
    fn get_upnp_announce_interval(&self) -> Duration;
}

impl UpnpConfigExt for Config {
    fn get_upnp_friendly_name(&self) -> String {
        self.get_string_or(&["host", "upnp", "friendly_name"], DEFAULT_FRIENDLY_NAME)
    }

    fn get_upnp_manufacturer(&self) -> String {
        self.get_string_or(&["host", "upnp", "manufacturer"], DEFAULT_MANUFACTURER)
    }

    fn get_upnp_model_name(&self) -> String {
        self.get_string_or(&["host", "upnp", "model_name"], DEFAULT_MODEL_NAME)
    }

    fn get_upnp_device_type(&self) -> String {
        self.get_string_or(&["host", "upnp", "device_type"], DEFAULT_DEVICE_TYPE)
    }

    fn get_upnp_service_type(&self) -> String {
        self.get_string_or(&["host", "upnp", "service_type"], DEFAULT_SERVICE_TYPE)
    }

    fn get_upnp_announce_interval(&self) -> Duration {
        let secs = self.get_u64_or(
            &["host", "upnp", "announce_interval_secs"],
            DEFAULT_ANNOUNCE_INTERVAL_SECS,
        );
        Duration::from_secs(secs.max(1))
    }
}
