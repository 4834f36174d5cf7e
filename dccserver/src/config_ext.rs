//! Extension de configuration pour le serveur de contrôle
//!
//! Ce module fournit le trait `ServerConfigExt`, qui lit les clés `host.*`
//! propres au service HTTP, et [`ServerSettings`], l'ensemble des réglages
//! passés explicitement au [`ServerLifecycleManager`](crate::ServerLifecycleManager).

use anyhow::{Result, bail};
use dccconfig::Config;
use dccupnp::DeviceDescription;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Variable d'environnement consultée quand `host.mode` vaut `auto`
pub const ENV_MODE_VAR: &str = "DCC_ENV";

const DEFAULT_MODE: &str = "auto";
const DEFAULT_WEB_ROOT: &str = "dist/web";
const DEFAULT_DEV_SERVER_URL: &str = "http://localhost:5173";
const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 250;

/// Mode de service des requêtes non destinées au plan de contrôle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeMode {
    /// Fichiers construits servis depuis `web_root`
    Production,
    /// Requêtes relayées vers le serveur de développement
    Development { upstream: Url },
}

impl ServeMode {
    /// Résout le mode à partir de la valeur de `host.mode`.
    ///
    /// `auto` choisit le développement seulement si `env_mode` vaut
    /// `development`.
    pub fn resolve(name: &str, env_mode: Option<&str>, upstream: Url) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "production" => Ok(ServeMode::Production),
            "development" => Ok(ServeMode::Development { upstream }),
            "auto" => match env_mode {
                Some(value) if value.trim().eq_ignore_ascii_case("development") => {
                    Ok(ServeMode::Development { upstream })
                }
                _ => Ok(ServeMode::Production),
            },
            other => bail!("Unknown serve mode '{}' (expected auto, production or development)", other),
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, ServeMode::Development { .. })
    }
}

/// Réglages du serveur de contrôle
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Port HTTP fixe du plan de contrôle (0 = port éphémère, pour les tests)
    pub http_port: u16,
    pub mode: ServeMode,
    /// Racine des fichiers de l'application web
    pub web_root: PathBuf,
    pub proxy_timeout: Duration,
    /// Délai entre l'envoi de la réponse `/api/shutdown` et l'arrêt de l'hôte
    pub shutdown_grace: Duration,
    pub description: DeviceDescription,
}

impl ServerSettings {
    /// Réglages par défaut en production
    pub fn new(http_port: u16, web_root: impl Into<PathBuf>, description: DeviceDescription) -> Self {
        Self {
            http_port,
            mode: ServeMode::Production,
            web_root: web_root.into(),
            proxy_timeout: Duration::from_secs(DEFAULT_PROXY_TIMEOUT_SECS),
            shutdown_grace: Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_MS),
            description,
        }
    }

    pub fn with_mode(mut self, mode: ServeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Construit les réglages depuis la configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            http_port: config.get_http_port(),
            mode: config.get_serve_mode()?,
            web_root: config.get_web_root(),
            proxy_timeout: config.get_proxy_timeout(),
            shutdown_grace: config.get_shutdown_grace(),
            description: DeviceDescription::from_config(config)?,
        })
    }
}

/// Trait d'extension pour lire la configuration du serveur de contrôle
pub trait ServerConfigExt {
    /// Mode effectif, `auto` résolu via `DCC_ENV`
    fn get_serve_mode(&self) -> Result<ServeMode>;

    /// Racine de l'application web (défaut: "dist/web")
    fn get_web_root(&self) -> PathBuf;

    /// URL du serveur de développement (défaut: "http://localhost:5173")
    fn get_dev_server_url(&self) -> Result<Url>;

    /// Timeout d'une requête relayée (défaut: 30 s)
    fn get_proxy_timeout(&self) -> Duration;

    /// Délai de grâce avant l'arrêt de l'hôte (défaut: 250 ms)
    fn get_shutdown_grace(&self) -> Duration;
}

impl ServerConfigExt for Config {
    fn get_serve_mode(&self) -> Result<ServeMode> {
        let name = self.get_string_or(&["host", "mode"], DEFAULT_MODE);
        let env_mode = std::env::var(ENV_MODE_VAR).ok();
        ServeMode::resolve(&name, env_mode.as_deref(), self.get_dev_server_url()?)
    }

    fn get_web_root(&self) -> PathBuf {
        PathBuf::from(self.get_string_or(&["host", "web_root"], DEFAULT_WEB_ROOT))
    }

    fn get_dev_server_url(&self) -> Result<Url> {
        let raw = self.get_string_or(&["host", "dev_server_url"], DEFAULT_DEV_SERVER_URL);
        Ok(Url::parse(&raw)?)
    }

    fn get_proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64_or(
            &["host", "proxy_timeout_secs"],
            DEFAULT_PROXY_TIMEOUT_SECS,
        ))
    }

    fn get_shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.get_u64_or(
            &["host", "shutdown_grace_ms"],
            DEFAULT_SHUTDOWN_GRACE_MS,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream() -> Url {
        Url::parse(DEFAULT_DEV_SERVER_URL).unwrap()
    }

    #[test]
    fn test_resolve_explicit_modes() {
        assert_eq!(
            ServeMode::resolve("production", Some("development"), upstream()).unwrap(),
            ServeMode::Production
        );
        assert!(
            ServeMode::resolve("Development", None, upstream())
                .unwrap()
                .is_development()
        );
    }

    #[test]
    fn test_resolve_auto_mode() {
        assert_eq!(
            ServeMode::resolve("auto", None, upstream()).unwrap(),
            ServeMode::Production
        );
        assert_eq!(
            ServeMode::resolve("auto", Some("production"), upstream()).unwrap(),
            ServeMode::Production
        );
        assert_eq!(
            ServeMode::resolve("auto", Some("development"), upstream()).unwrap(),
            ServeMode::Development {
                upstream: upstream()
            }
        );
    }

    #[test]
    fn test_resolve_unknown_mode() {
        assert!(ServeMode::resolve("staging", None, upstream()).is_err());
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::from_yaml_str(
            "host:\n  http_port: 8080\n  mode: development\n  web_root: /srv/ui\n  \
             dev_server_url: http://127.0.0.1:3000\n  proxy_timeout_secs: 5\n  \
             shutdown_grace_ms: 10\n  device_uuid: abcd\n",
        )
        .unwrap();
        let settings = ServerSettings::from_config(&config).unwrap();

        assert_eq!(settings.http_port, 8080);
        assert_eq!(
            settings.mode,
            ServeMode::Development {
                upstream: Url::parse("http://127.0.0.1:3000").unwrap()
            }
        );
        assert_eq!(settings.web_root, PathBuf::from("/srv/ui"));
        assert_eq!(settings.proxy_timeout, Duration::from_secs(5));
        assert_eq!(settings.shutdown_grace, Duration::from_millis(10));
        assert_eq!(settings.description.uuid, "abcd");
    }

    #[test]
    fn test_settings_defaults() {
        let config = Config::defaults();
        assert_eq!(config.get_web_root(), PathBuf::from(DEFAULT_WEB_ROOT));
        assert_eq!(config.get_proxy_timeout(), Duration::from_secs(30));
        assert_eq!(config.get_shutdown_grace(), Duration::from_millis(250));
        assert_eq!(config.get_dev_server_url().unwrap(), upstream());
    }
}
