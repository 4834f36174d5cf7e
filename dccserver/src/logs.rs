//! Initialisation du logging (`tracing`)
//!
//! Le niveau est porté par un filtre rechargeable : il peut être changé
//! à chaud via [`LogHandle::set_max_level`].

use std::sync::{Arc, RwLock};
use tracing::Level;
use tracing_subscriber::{
    Registry, filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

/// Options d'initialisation du système de logging
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Niveau initial (ERROR, WARN, INFO, DEBUG, TRACE)
    pub min_level: String,
    /// Activer la sortie console
    pub enable_console: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            min_level: "INFO".to_string(),
            enable_console: true,
        }
    }
}

/// Poignée de contrôle du niveau de log
#[derive(Clone)]
pub struct LogHandle {
    max_level: Arc<RwLock<Level>>,
    reload_handle: reload::Handle<LevelFilter, Registry>,
}

impl LogHandle {
    pub fn set_max_level(&self, level: Level) {
        if let Ok(mut current) = self.max_level.write() {
            *current = level;
        }

        let level_filter = LevelFilter::from_level(level);
        if let Err(e) = self.reload_handle.reload(level_filter) {
            eprintln!("❌ Failed to reload log level filter: {}", e);
        } else {
            tracing::info!("✅ Log level set to {}", level_to_string(level));
        }
    }

    pub fn max_level(&self) -> Level {
        self.max_level
            .read()
            .map(|level| *level)
            .unwrap_or(Level::INFO)
    }
}

/// Installe le subscriber global.
///
/// Un niveau inconnu dans les options retombe sur INFO.
pub fn init_logging(options: LoggingOptions) -> LogHandle {
    let level = string_to_level(&options.min_level).unwrap_or(Level::INFO);
    let (filter, reload_handle) = reload::Layer::new(LevelFilter::from_level(level));

    let subscriber = Registry::default().with(filter);
    let result = if options.enable_console {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .try_init()
    } else {
        subscriber.try_init()
    };
    if let Err(e) = result {
        eprintln!("❌ Logging already initialized: {}", e);
    }

    LogHandle {
        max_level: Arc::new(RwLock::new(level)),
        reload_handle,
    }
}

pub fn string_to_level(s: &str) -> Option<Level> {
    match s.trim().to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

pub fn level_to_string(level: Level) -> String {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(string_to_level("debug"), Some(Level::DEBUG));
        assert_eq!(string_to_level(" WARN "), Some(Level::WARN));
        assert_eq!(string_to_level("verbose"), None);
        assert_eq!(level_to_string(Level::TRACE), "TRACE");
    }

    #[test]
    fn test_log_handle_tracks_level() {
        let handle = init_logging(LoggingOptions {
            min_level: "WARN".to_string(),
            enable_console: false,
        });
        assert_eq!(handle.max_level(), Level::WARN);
        handle.set_max_level(Level::DEBUG);
        assert_eq!(handle.max_level(), Level::DEBUG);
    }
}
