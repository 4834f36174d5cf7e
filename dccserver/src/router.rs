//! Aiguillage des requêtes entre plan de contrôle, fichiers statiques et
//! relais de développement.
//!
//! | Méthode | Chemin              | Décision              |
//! |---------|---------------------|-----------------------|
//! | POST    | `/api/shutdown`     | `ControlShutdown`     |
//! | GET     | `/api/info`         | `ControlStatus`       |
//! | GET     | `/description.xml`  | `ServiceDescription`  |
//! | *       | * (développement)   | `ProxyForward`        |
//! | *       | * (production)      | `StaticAsset`         |

use crate::assets::StaticAssetServer;
use crate::config_ext::{ServeMode, ServerSettings};
use crate::control;
use crate::proxy::ReverseProxyClient;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum_server::Handle;
use dccupnp::DESCRIPTION_PATH;
use dccutils::PlatformOps;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::debug;

pub const INFO_PATH: &str = "/api/info";
pub const SHUTDOWN_PATH: &str = "/api/shutdown";

/// Traitement retenu pour une requête
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    ControlStatus,
    ControlShutdown,
    ServiceDescription,
    ProxyForward,
    StaticAsset,
}

/// Décision de routage, fonction pure de la méthode, du chemin et du mode.
pub fn route(method: &Method, path: &str, mode: &ServeMode) -> RouteDecision {
    if method == Method::POST && path == SHUTDOWN_PATH {
        RouteDecision::ControlShutdown
    } else if method == Method::GET && path == INFO_PATH {
        RouteDecision::ControlStatus
    } else if method == Method::GET && path == DESCRIPTION_PATH {
        RouteDecision::ServiceDescription
    } else if mode.is_development() {
        RouteDecision::ProxyForward
    } else {
        RouteDecision::StaticAsset
    }
}

/// Contexte partagé par les requêtes d'un listener actif
pub struct RequestContext {
    /// Adresse sur laquelle le listener est lié
    pub address: Ipv4Addr,
    pub port: u16,
    /// Date de démarrage (ms epoch)
    pub started_at: i64,
    pub handle: Handle,
    /// Passe à `false` dès le début de l'arrêt
    pub live: AtomicBool,
    pub ops: Arc<dyn PlatformOps>,
    pub settings: Arc<ServerSettings>,
    pub assets: StaticAssetServer,
    pub proxy: Option<ReverseProxyClient>,
}

impl RequestContext {
    pub fn new(
        address: Ipv4Addr,
        port: u16,
        started_at: i64,
        handle: Handle,
        ops: Arc<dyn PlatformOps>,
        settings: Arc<ServerSettings>,
    ) -> Result<Self, reqwest::Error> {
        let proxy = match &settings.mode {
            ServeMode::Development { upstream } => Some(ReverseProxyClient::new(
                upstream.clone(),
                settings.proxy_timeout,
            )?),
            ServeMode::Production => None,
        };
        let assets = StaticAssetServer::new(
            settings.web_root.clone(),
            !settings.mode.is_development(),
        );

        Ok(Self {
            address,
            port,
            started_at,
            handle,
            live: AtomicBool::new(true),
            ops,
            settings,
            assets,
            proxy,
        })
    }
}

/// Router axum avec un unique handler d'aiguillage
pub fn build_router(ctx: Arc<RequestContext>) -> Router {
    Router::new().fallback(dispatch).with_state(ctx)
}

async fn dispatch(State(ctx): State<Arc<RequestContext>>, request: Request) -> Response {
    let decision = route(request.method(), request.uri().path(), &ctx.settings.mode);
    debug!("{} {} -> {:?}", request.method(), request.uri(), decision);

    match decision {
        RouteDecision::ControlShutdown => control::shutdown(&ctx),
        RouteDecision::ControlStatus => control::info(&ctx).await,
        RouteDecision::ServiceDescription => control::description(&ctx).await,
        RouteDecision::ProxyForward => match &ctx.proxy {
            Some(proxy) => proxy.forward(request).await.into_response(),
            None => ctx.assets.serve(request.uri().path()).await,
        },
        RouteDecision::StaticAsset => ctx.assets.serve(request.uri().path()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn development() -> ServeMode {
        ServeMode::Development {
            upstream: Url::parse("http://localhost:5173").unwrap(),
        }
    }

    #[test]
    fn test_control_routes_win_in_every_mode() {
        for mode in [ServeMode::Production, development()] {
            assert_eq!(
                route(&Method::POST, SHUTDOWN_PATH, &mode),
                RouteDecision::ControlShutdown
            );
            assert_eq!(route(&Method::GET, INFO_PATH, &mode), RouteDecision::ControlStatus);
            assert_eq!(
                route(&Method::GET, "/description.xml", &mode),
                RouteDecision::ServiceDescription
            );
        }
    }

    #[test]
    fn test_method_matters() {
        let mode = ServeMode::Production;
        assert_eq!(route(&Method::GET, SHUTDOWN_PATH, &mode), RouteDecision::StaticAsset);
        assert_eq!(route(&Method::POST, INFO_PATH, &mode), RouteDecision::StaticAsset);
        assert_eq!(
            route(&Method::GET, SHUTDOWN_PATH, &development()),
            RouteDecision::ProxyForward
        );
    }

    #[test]
    fn test_unmatched_paths_follow_mode() {
        assert_eq!(
            route(&Method::GET, "/this-does-not-exist", &ServeMode::Production),
            RouteDecision::StaticAsset
        );
        assert_eq!(
            route(&Method::GET, "/this-does-not-exist", &development()),
            RouteDecision::ProxyForward
        );
        assert_eq!(
            route(&Method::GET, "/api/info/", &ServeMode::Production),
            RouteDecision::StaticAsset
        );
    }
}
