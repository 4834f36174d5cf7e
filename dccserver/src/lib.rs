//! # dccserver - Serveur du plan de contrôle
//!
//! Un unique listener HTTP multiplexe :
//!
//! - l'API de contrôle (`/api/info`, `/api/shutdown`) et `/description.xml`
//! - l'application web, servie depuis le disque avec repli SPA
//! - en développement, le relais vers le serveur de l'interface
//!
//! Le [`ServerLifecycleManager`] en garantit l'unicité et synchronise
//! l'annonceur SSDP avec son cycle de vie ; le [`ControlBridge`] l'expose aux
//! collaborateurs externes.

pub mod assets;
pub mod bridge;
pub mod config_ext;
pub mod control;
pub mod errors;
pub mod logs;
pub mod proxy;
pub mod router;
pub mod server;

pub use assets::StaticAssetServer;
pub use bridge::{BridgeEvent, ControlBridge};
pub use config_ext::{ServeMode, ServerConfigExt, ServerSettings};
pub use control::{ServerSnapshot, UI_PLACEHOLDER_ADDRESS};
pub use errors::{RequestError, ServerError};
pub use logs::{LogHandle, LoggingOptions, init_logging};
pub use proxy::ReverseProxyClient;
pub use router::{RequestContext, RouteDecision, build_router, route};
pub use server::{ServerLifecycleManager, StartOutcome};
