//! Handlers du plan de contrôle : `/api/info`, `/api/shutdown` et
//! `/description.xml`.

use crate::router::RequestContext;
use axum::Json;
use axum::body::{Body, Bytes};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use dccutils::{AddressSource, PlatformOps};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Adresse affichée par l'interface quand aucune adresse n'est connue
pub const UI_PLACEHOLDER_ADDRESS: &str = "192.168.0.100";

/// État observable du serveur
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSnapshot {
    /// Adresse résolue au moment de l'appel (`None` si la résolution échoue)
    pub ip_address: Option<String>,
    pub port: u16,
    pub connections: usize,
    /// Date de démarrage en millisecondes epoch, 0 à l'arrêt
    pub started_at: i64,
    pub is_running: bool,
    /// Origine de l'adresse, pour signaler le mode dégradé
    #[serde(skip)]
    pub address_source: Option<AddressSource>,
}

impl ServerSnapshot {
    /// Adresse à afficher, avec repli sur une valeur d'exemple
    pub fn display_address(&self) -> &str {
        self.ip_address.as_deref().unwrap_or(UI_PLACEHOLDER_ADDRESS)
    }

    pub fn is_degraded(&self) -> bool {
        self.address_source == Some(AddressSource::LoopbackFallback)
    }
}

/// `GET /api/info`
pub async fn info(ctx: &RequestContext) -> Response {
    let (ip_address, address_source) = match ctx.ops.resolve_address().await {
        Ok(identity) => (Some(identity.address.to_string()), Some(identity.source)),
        Err(e) => {
            warn!("❌ Cannot resolve host address for /api/info: {}", e);
            (None, None)
        }
    };

    let is_running = ctx.live.load(Ordering::SeqCst);
    let snapshot = ServerSnapshot {
        ip_address,
        port: ctx.port,
        connections: ctx.handle.connection_count(),
        started_at: if is_running { ctx.started_at } else { 0 },
        is_running,
        address_source,
    };

    Json(json!({ "status": "ok", "data": snapshot })).into_response()
}

/// `GET /description.xml`, reflète l'adresse courante de l'hôte
pub async fn description(ctx: &RequestContext) -> Response {
    let address = match ctx.ops.resolve_address().await {
        Ok(identity) => identity.address,
        Err(_) => ctx.address,
    };

    match ctx.settings.description.to_xml(address, ctx.port) {
        Ok(xml) => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/xml; charset=\"utf-8\""),
            )],
            xml,
        )
            .into_response(),
        Err(e) => {
            error!("❌ {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /api/shutdown`
///
/// Le corps JSON est émis en flux : l'arrêt de l'hôte est planifié sur une
/// tâche détachée qui attend que le corps ait été remis à la connexion (ou
/// abandonné), puis le délai de grâce.
pub fn shutdown(ctx: &RequestContext) -> Response {
    shutdown_response(Arc::clone(&ctx.ops), ctx.settings.shutdown_grace)
}

pub fn shutdown_response(ops: Arc<dyn PlatformOps>, grace: Duration) -> Response {
    let (sent_tx, sent_rx) = oneshot::channel::<()>();
    let payload = json!({ "status": "ok", "shuttingDown": true }).to_string();

    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(Bytes::from(payload));
        let _ = sent_tx.send(());
    };

    tokio::spawn(async move {
        // Err si le corps a été abandonné : l'arrêt a lieu quand même
        let _ = sent_rx.await;
        tokio::time::sleep(grace).await;
        match ops.shutdown_host().await {
            Ok(output) => info!("🛑 Host shutdown command accepted: {}", output),
            Err(e) => error!("❌ Host shutdown failed: {}", e),
        }
    });

    (
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        Body::from_stream(stream),
    )
        .into_response()
}
