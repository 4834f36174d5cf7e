//! Relais des requêtes vers le serveur de développement de l'interface.

use crate::errors::RequestError;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// En-têtes propres à une connexion, jamais relayés
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Retire les en-têtes hop-by-hop, y compris ceux listés dans `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    for name in listed {
        headers.remove(name.as_str());
    }
}

/// Client du serveur de développement
#[derive(Debug, Clone)]
pub struct ReverseProxyClient {
    upstream: Url,
    client: reqwest::Client,
}

impl ReverseProxyClient {
    pub fn new(upstream: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { upstream, client })
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// Valeur de `Host` vue par le serveur amont
    fn upstream_authority(&self) -> String {
        let host = self.upstream.host_str().unwrap_or("localhost");
        match self.upstream.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// URL amont pour le chemin et la requête reçus
    pub fn target_url(&self, path: &str, query: Option<&str>) -> Url {
        let mut target = self.upstream.clone();
        target.set_path(path);
        target.set_query(query);
        target
    }

    /// Relaie la requête telle quelle, `Host` réécrit. Aucune nouvelle tentative.
    pub async fn forward(&self, request: Request) -> Result<Response, RequestError> {
        let (parts, body) = request.into_parts();
        let target = self.target_url(parts.uri.path(), parts.uri.query());
        debug!("🔀 {} {} -> {}", parts.method, parts.uri, target);

        let has_body = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() != "0")
            || parts.headers.contains_key(header::TRANSFER_ENCODING);

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        if let Ok(host) = HeaderValue::from_str(&self.upstream_authority()) {
            headers.insert(header::HOST, host);
        }

        let mut builder = self
            .client
            .request(parts.method, target.as_str())
            .headers(headers);
        if has_body {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = builder.send().await?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let mut response = Body::from_stream(upstream.bytes_stream()).into_response();
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}
