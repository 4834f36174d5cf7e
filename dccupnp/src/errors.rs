use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SsdpError {
    #[error("SSDP advertiser failed to start on {address}: {source}")]
    AdvertiseStart {
        address: Ipv4Addr,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DescriptionError {
    #[error("Failed to serialize device description XML: {0}")]
    Serialization(String),
}
