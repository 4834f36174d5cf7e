//! # dccupnp - Découverte du centre de contrôle sur le réseau local
//!
//! - [`ssdp`] : annonces SSDP et réponses aux M-SEARCH
//! - [`description`] : document `/description.xml` pointé par `LOCATION`
//! - [`config_ext`] : clés `host.upnp.*` de la configuration

pub mod config_ext;
pub mod description;
pub mod errors;
pub mod ssdp;

pub use config_ext::UpnpConfigExt;
pub use description::{DESCRIPTION_PATH, DeviceDescription};
pub use errors::{DescriptionError, SsdpError};
pub use ssdp::{Advertiser, AdvertiserState, SsdpServer};
