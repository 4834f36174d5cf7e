//! Représentation d'un device SSDP

use super::{MAX_AGE, SSDP_MULTICAST_ADDR, SSDP_PORT};

/// Device SSDP avec ses métadonnées pour les annonces
#[derive(Debug, Clone)]
pub struct SsdpDevice {
    /// UUID du device (sans le préfixe "uuid:")
    pub uuid: String,

    /// Type du device (ex: "urn:schemas-desktop-control:device:ControlCenter:1")
    pub device_type: String,

    /// Type du service de contrôle
    pub service_type: String,

    /// URL de la description du device
    pub location: String,

    /// Identifiant du serveur (ex: "Linux/6.5.0 UPnP/1.1 DesktopControl/0.1.0")
    pub server: String,

    /// Liste des types de notification (NT) à annoncer
    notification_types: Vec<String>,
}

impl SsdpDevice {
    pub fn new(
        uuid: String,
        device_type: String,
        service_type: String,
        location: String,
        server: String,
    ) -> Self {
        let mut notification_types = vec![
            format!("uuid:{}", uuid),
            "upnp:rootdevice".to_string(),
            device_type.clone(),
        ];
        if !notification_types.contains(&service_type) {
            notification_types.push(service_type.clone());
        }

        Self {
            uuid,
            device_type,
            service_type,
            location,
            server,
            notification_types,
        }
    }

    /// Retourne la liste des types de notification
    pub fn notification_types(&self) -> &[String] {
        &self.notification_types
    }

    /// USN associé à un NT
    pub fn usn(&self, nt: &str) -> String {
        if nt.starts_with("uuid:") {
            nt.to_string()
        } else {
            format!("uuid:{}::{}", self.uuid, nt)
        }
    }

    /// NTs à renvoyer pour un `ST` de M-SEARCH (vide si rien ne correspond)
    pub fn matching_targets(&self, st: &str) -> Vec<String> {
        if st == "ssdp:all" {
            self.notification_types.clone()
        } else if self.notification_types.iter().any(|nt| nt == st) {
            vec![st.to_string()]
        } else {
            Vec::new()
        }
    }

    /// NOTIFY ssdp:alive
    pub fn alive_message(&self, nt: &str) -> String {
        format!(
            "NOTIFY * HTTP/1.1\r\n\
             HOST: {}:{}\r\n\
             CACHE-CONTROL: max-age={}\r\n\
             LOCATION: {}\r\n\
             NT: {}\r\n\
             NTS: ssdp:alive\r\n\
             SERVER: {}\r\n\
             USN: {}\r\n\
             \r\n",
            SSDP_MULTICAST_ADDR,
            SSDP_PORT,
            MAX_AGE,
            self.location,
            nt,
            self.server,
            self.usn(nt)
        )
    }

    /// NOTIFY ssdp:byebye
    pub fn byebye_message(&self, nt: &str) -> String {
        format!(
            "NOTIFY * HTTP/1.1\r\n\
             HOST: {}:{}\r\n\
             NT: {}\r\n\
             NTS: ssdp:byebye\r\n\
             USN: {}\r\n\
             \r\n",
            SSDP_MULTICAST_ADDR,
            SSDP_PORT,
            nt,
            self.usn(nt)
        )
    }

    /// Réponse unicast à un M-SEARCH. `date` est au format RFC 1123.
    pub fn search_response(&self, nt: &str, date: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\n\
             CACHE-CONTROL: max-age={}\r\n\
             DATE: {}\r\n\
             EXT:\r\n\
             LOCATION: {}\r\n\
             SERVER: {}\r\n\
             ST: {}\r\n\
             USN: {}\r\n\
             \r\n",
            MAX_AGE,
            date,
            self.location,
            self.server,
            nt,
            self.usn(nt)
        )
    }
}
