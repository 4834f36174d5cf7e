//! # Desktop Control Configuration Module
//!
//! This module provides configuration management for the desktop control
//! center, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern (for the binary only)
//!
//! The configuration directory is optional. When it cannot be created or
//! written, the configuration lives in memory only and a warning is logged.
//!
//! ## Usage
//!
//! ```no_run
//! use dccconfig::get_config;
//!
//! // Get the global configuration
//! let config = get_config();
//!
//! // Access configuration values
//! let port = config.get_http_port();
//! let uuid = config.get_device_uuid()?;
//!
//! // Update configuration values
//! config.set_http_port(9000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{info, warn};
use uuid::Uuid;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("dcc.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> = Arc::new(Config::load_config("").unwrap_or_else(|err| {
        warn!(error=%err, "Failed to load configuration, using embedded defaults");
        Config::defaults()
    }));
}

const ENV_CONFIG_DIR: &str = "DCC_CONFIG";
const ENV_PREFIX: &str = "DCC_CONFIG__";
const CONFIG_DIR_NAME: &str = ".dcc";

// Default values for configuration
const DEFAULT_HTTP_PORT: u16 = 1339;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_AUTOSTART: bool = true;
const DEFAULT_LOOPBACK_FALLBACK: bool = true;

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> bool {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => b,
                _ => $default,
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Configuration manager for the desktop control center
///
/// # Examples
///
/// ```
/// use dccconfig::Config;
///
/// let config = Config::from_yaml_str("host:\n  http_port: 8080\n")?;
/// assert_eq!(config.get_http_port(), 8080);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: Option<PathBuf>,
    path: Option<PathBuf>,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.data().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> PathBuf {
        // 1. Try provided directory
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        // 3. Try current directory
        if Path::new(CONFIG_DIR_NAME).exists() {
            return PathBuf::from(CONFIG_DIR_NAME);
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config;
            }
        }

        PathBuf::from(CONFIG_DIR_NAME)
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path)?;

        Ok(())
    }

    /// Builds a configuration holding only the embedded defaults, without
    /// any backing file.
    pub fn defaults() -> Self {
        let value = serde_yaml::from_str::<Value>(DEFAULT_CONFIG).unwrap_or_else(|err| {
            warn!(error=%err, "Embedded default configuration is invalid");
            Value::Mapping(Mapping::new())
        });

        Self {
            config_dir: None,
            path: None,
            data: Mutex::new(Self::lower_keys_value(value)),
        }
    }

    /// Builds an in-memory configuration from a YAML document merged over
    /// the embedded defaults. Nothing is ever written to disk.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config = Self::defaults();
        let external: Value = serde_yaml::from_str(yaml)?;
        {
            let mut data = config.data();
            merge_yaml(&mut data, &Self::lower_keys_value(external));
        }
        Ok(config)
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration when the directory is writable
    ///
    /// An unusable directory is not an error: the configuration then stays
    /// in memory.
    pub fn load_config(directory: &str) -> Result<Self> {
        let dir = Self::find_config_dir(directory);

        let (config_dir, path) = match Self::validate_config_dir(&dir) {
            Ok(()) => {
                info!(config_dir=%dir.display(), "Using config directory");
                let path = dir.join("config.yaml");
                (Some(dir), Some(path))
            }
            Err(err) => {
                warn!(
                    config_dir=%dir.display(),
                    error=%err,
                    "Config directory unusable, keeping configuration in memory"
                );
                (None, None)
            }
        };

        let mut config_value = Self::defaults().data().clone();

        if let Some(path) = &path {
            match fs::read(path) {
                Ok(yaml_data) => {
                    info!(config_file=%path.display(), "Loaded config file");
                    let external_value: Value = serde_yaml::from_slice(&yaml_data)?;
                    merge_yaml(&mut config_value, &Self::lower_keys_value(external_value));
                }
                Err(_) => {
                    info!(config_file=%path.display(), "Config file not found, using default embedded config");
                }
            }
        }

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        if let Err(err) = config.save() {
            warn!(error=%err, "Failed to save configuration");
        }
        Ok(config)
    }

    /// Returns the configuration directory, if the configuration is backed
    /// by one.
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Saves the current configuration to the config.yaml file
    ///
    /// In-memory configurations have nothing to save and return `Ok(())`.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let yaml = serde_yaml::to_string(&*self.data())?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "http_port"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data();
        Self::set_value_internal(&mut data, path, value)?;
        drop(data);
        self.save()?;
        Ok(())
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key = path[0].to_lowercase();
            let key_value = Value::String(key);
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();

                if let Some(next) = map.get(&Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    /// Gets a non-empty string value, or `default` when the key is missing,
    /// empty or not a string.
    pub fn get_string_or(&self, path: &[&str], default: &str) -> String {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            _ => default.to_string(),
        }
    }

    /// Gets an unsigned integer value, or `default` when the key is missing
    /// or not a number. Numeric strings are accepted.
    pub fn get_u64_or(&self, path: &[&str], default: u64) -> u64 {
        match self.get_value(path) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(default),
            Ok(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    if let Value::String(s) = k {
                        new_map.insert(Value::String(s.to_lowercase()), Self::lower_keys_value(v));
                    } else {
                        new_map.insert(k, Self::lower_keys_value(v));
                    }
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Gets the HTTP port of the control plane
    ///
    /// Returns the configured port, or the default port (1339) if not
    /// configured or invalid.
    pub fn get_http_port(&self) -> u16 {
        match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => match n.as_u64().map(u16::try_from) {
                Some(Ok(port)) => port,
                _ => {
                    warn!("Invalid HTTP port {}, using default {}", n, DEFAULT_HTTP_PORT);
                    DEFAULT_HTTP_PORT
                }
            },
            Ok(Value::String(s)) => match s.parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    warn!("Invalid HTTP port '{}', using default {}", s, DEFAULT_HTTP_PORT);
                    DEFAULT_HTTP_PORT
                }
            },
            Ok(_) => {
                warn!(
                    "HTTP port not a number or string, using default {}",
                    DEFAULT_HTTP_PORT
                );
                DEFAULT_HTTP_PORT
            }
            Err(err) => {
                warn!(
                    "Failed to get HTTP port: {}, using default {}",
                    err, DEFAULT_HTTP_PORT
                );
                DEFAULT_HTTP_PORT
            }
        }
    }

    /// Sets the HTTP port in configuration
    pub fn set_http_port(&self, port: u16) -> Result<()> {
        let n = Number::from(port);
        self.set_value(&["host", "http_port"], Value::Number(n))
    }

    /// Gets the per-install device identifier, generating and saving a new
    /// UUID if none exists yet.
    ///
    /// The returned value never carries the `uuid:` prefix.
    pub fn get_device_uuid(&self) -> Result<String> {
        let path = &["host", "device_uuid"];
        match self.get_value(path) {
            Ok(Value::String(uuid)) if !uuid.trim().is_empty() => {
                let uuid_str = uuid.trim();
                Ok(uuid_str.strip_prefix("uuid:").unwrap_or(uuid_str).to_string())
            }
            _ => {
                let new_uuid = Uuid::new_v4().to_string();
                self.set_value(path, Value::String(new_uuid.clone()))?;
                info!(uuid=%new_uuid, "Generated device identifier");
                Ok(new_uuid)
            }
        }
    }

    /// Sets the per-install device identifier
    pub fn set_device_uuid(&self, uuid: String) -> Result<()> {
        let uuid_str = uuid.trim();
        let sanitized = uuid_str.strip_prefix("uuid:").unwrap_or(uuid_str).to_string();
        self.set_value(&["host", "device_uuid"], Value::String(sanitized))
    }

    impl_bool_config!(
        get_autostart,
        set_autostart,
        &["host", "autostart"],
        DEFAULT_AUTOSTART
    );

    impl_bool_config!(
        get_loopback_fallback,
        set_loopback_fallback,
        &["host", "network", "loopback_fallback"],
        DEFAULT_LOOPBACK_FALLBACK
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> String {
        self.get_string_or(&["host", "logger", "min_level"], DEFAULT_LOG_MIN_LEVEL)
    }

    /// Définit le niveau de log minimum dans la configuration
    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Returns the global configuration instance
///
/// This function provides access to the singleton configuration instance,
/// which is lazily loaded on first access. Library crates never call it:
/// they receive their settings explicitly.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // pour les scalaires ou séquences, on remplace
    }
}
