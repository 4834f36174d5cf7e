//! Document de description du device (`/description.xml`).
//!
//! Le document suit le schéma `urn:schemas-upnp-org:device-1-0` et pointe,
//! via `presentationURL`, vers l'adresse de base du serveur HTTP.

use crate::config_ext::UpnpConfigExt;
use crate::errors::DescriptionError;
use dccconfig::Config;
use std::net::Ipv4Addr;
use xmltree::{Element, EmitterConfig, XMLNode};

/// Chemin HTTP du document de description
pub const DESCRIPTION_PATH: &str = "/description.xml";

/// Identité fixe du device annoncé sur le réseau
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    /// UUID du device (sans le préfixe "uuid:")
    pub uuid: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub model_name: String,
    pub device_type: String,
    pub service_type: String,
}

impl DeviceDescription {
    /// Construit la description depuis la configuration.
    ///
    /// L'UUID est généré et sauvegardé au premier appel, il reste ensuite
    /// fixe pour cette installation.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            uuid: config.get_device_uuid()?,
            friendly_name: config.get_upnp_friendly_name(),
            manufacturer: config.get_upnp_manufacturer(),
            model_name: config.get_upnp_model_name(),
            device_type: config.get_upnp_device_type(),
            service_type: config.get_upnp_service_type(),
        })
    }

    /// UDN du device (`uuid:...`)
    pub fn udn(&self) -> String {
        format!("uuid:{}", self.uuid)
    }

    /// URL de base du serveur HTTP
    pub fn base_url(address: Ipv4Addr, port: u16) -> String {
        format!("http://{}:{}/", address, port)
    }

    /// URL du document de description, annoncée dans `LOCATION`
    pub fn location(address: Ipv4Addr, port: u16) -> String {
        format!("http://{}:{}{}", address, port, DESCRIPTION_PATH)
    }

    /// Génère l'élément XML racine de la description.
    pub fn description_element(&self, address: Ipv4Addr, port: u16) -> Element {
        let mut root = Element::new("root");
        root.attributes.insert(
            "xmlns".to_string(),
            "urn:schemas-upnp-org:device-1-0".to_string(),
        );

        // specVersion
        let mut spec_version = Element::new("specVersion");
        spec_version.children.push(XMLNode::Element(text_element("major", "1")));
        spec_version.children.push(XMLNode::Element(text_element("minor", "0")));
        root.children.push(XMLNode::Element(spec_version));

        let mut device = Element::new("device");
        for (name, value) in [
            ("deviceType", self.device_type.clone()),
            ("friendlyName", self.friendly_name.clone()),
            ("manufacturer", self.manufacturer.clone()),
            ("modelName", self.model_name.clone()),
            ("UDN", self.udn()),
            ("presentationURL", Self::base_url(address, port)),
        ] {
            device.children.push(XMLNode::Element(text_element(name, &value)));
        }
        root.children.push(XMLNode::Element(device));

        root
    }

    /// Sérialise la description, en-tête XML compris.
    pub fn to_xml(&self, address: Ipv4Addr, port: u16) -> Result<String, DescriptionError> {
        let elem = self.description_element(address, port);

        let config = EmitterConfig::new()
            .perform_indent(true)
            .indent_string("  ")
            .write_document_declaration(false);

        let mut xml_output = Vec::new();
        elem.write_with_config(&mut xml_output, config)
            .map_err(|e| DescriptionError::Serialization(e.to_string()))?;

        let mut xml = String::from_utf8_lossy(&xml_output).to_string();
        xml.insert_str(0, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        Ok(xml)
    }
}

fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.to_string()));
    elem
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description() -> DeviceDescription {
        DeviceDescription {
            uuid: "0f6c1d9e-7d3b-4b1a-9c55-2f2f8a0d1e11".to_string(),
            friendly_name: "Desktop Control Center".to_string(),
            manufacturer: "Desktop Control".to_string(),
            model_name: "Desktop Control Center".to_string(),
            device_type: "urn:schemas-desktop-control:device:ControlCenter:1".to_string(),
            service_type: "urn:schemas-desktop-control:service:ControlApi:1".to_string(),
        }
    }

    #[test]
    fn test_location_and_base_url() {
        let addr = Ipv4Addr::new(192, 168, 1, 10);
        assert_eq!(
            DeviceDescription::location(addr, 1339),
            "http://192.168.1.10:1339/description.xml"
        );
        assert_eq!(DeviceDescription::base_url(addr, 1339), "http://192.168.1.10:1339/");
    }

    #[test]
    fn test_description_xml_content() {
        let xml = description()
            .to_xml(Ipv4Addr::new(192, 168, 1, 10), 1339)
            .unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert_eq!(xml.matches("<?xml").count(), 1);
        assert!(xml.contains("urn:schemas-upnp-org:device-1-0"));
        assert!(xml.contains(
            "<deviceType>urn:schemas-desktop-control:device:ControlCenter:1</deviceType>"
        ));
        assert!(xml.contains("<friendlyName>Desktop Control Center</friendlyName>"));
        assert!(xml.contains("<UDN>uuid:0f6c1d9e-7d3b-4b1a-9c55-2f2f8a0d1e11</UDN>"));
        assert!(xml.contains("<presentationURL>http://192.168.1.10:1339/</presentationURL>"));
    }

    #[test]
    fn test_description_reflects_address() {
        let desc = description();
        let a = desc.to_xml(Ipv4Addr::new(10, 0, 0, 1), 1339).unwrap();
        let b = desc.to_xml(Ipv4Addr::new(10, 0, 0, 2), 1339).unwrap();
        assert_ne!(a, b);
        assert!(b.contains("http://10.0.0.2:1339/"));
    }

    #[test]
    fn test_from_config_uses_upnp_keys() {
        let config = Config::from_yaml_str(
            "host:\n  device_uuid: \"uuid:abcd\"\n  upnp:\n    friendly_name: Salon\n",
        )
        .unwrap();
        let desc = DeviceDescription::from_config(&config).unwrap();
        assert_eq!(desc.uuid, "abcd");
        assert_eq!(desc.udn(), "uuid:abcd");
        assert_eq!(desc.friendly_name, "Salon");
    }
}
