use thiserror::Error;

/// Échecs de résolution de l'adresse réseau de l'hôte
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("No usable IPv4 address found")]
    NoAddressFound,

    #[error("Network interface enumeration failed: {0}")]
    Enumeration(#[from] std::io::Error),
}

/// Échecs de l'arrêt de l'hôte
#[derive(Error, Debug)]
pub enum ShutdownError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}
