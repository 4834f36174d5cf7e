use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dccutils::IdentityError;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tracing::error;

/// Erreurs du cycle de vie du listener HTTP, remontées à l'appelant de `start()`
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Cannot resolve the host address: {0}")]
    Identity(#[from] IdentityError),

    #[error("Cannot bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot build the development proxy client: {0}")]
    ProxyClient(#[source] reqwest::Error),
}

/// Erreurs limitées à une requête : elles deviennent un code HTTP
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Upstream development server unreachable: {0}")]
    ProxyUpstream(#[from] reqwest::Error),

    #[error("Cannot read asset {}: {source}", path.display())]
    AssetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::ProxyUpstream(_) => StatusCode::BAD_GATEWAY,
            RequestError::AssetRead { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        error!("❌ {}", self);
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason.to_string()).into_response()
    }
}
