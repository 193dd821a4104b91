// Server settings: defaults, then file, then environment, then CLI flags
use crate::auth::{ApiKeys, INSECURE_DEFAULT_CLIENT, INSECURE_DEFAULT_KEY};
use config::{Config, Environment, File};
use error_common::{Result, ServiceError};
use logger_redacted::LoggerConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Settings file read when `--config` is not given; optional
pub const DEFAULT_CONFIG_FILE: &str = "confman.toml";
pub const ENV_PREFIX: &str = "CONFMAN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackend,
    pub sqlite_path: PathBuf,
    pub max_connections: u32,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            sqlite_path: PathBuf::from("data/config.db"),
            max_connections: 5,
        }
    }
}

/// One configured API key; a list rather than a map because settings keys
/// are case-folded while API keys are not
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySetting {
    pub key: String,
    pub client: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub api_keys: Vec<ApiKeySetting>,
    /// Install `dev-api-key` when no keys are configured. Development only.
    pub allow_insecure_default_key: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsSection {
    /// `*` allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub auth: AuthSection,
    pub logging: LoggerConfig,
    pub cors: CorsSection,
}

impl ServerSettings {
    /// Load settings from `path` (or the optional default file) and the
    /// `CONFMAN_` environment
    ///
    /// # Errors
    ///
    /// Fails when an explicitly given file is missing or any source does not
    /// match the settings layout.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`ServerSettings::load`], reading environment variables from
    /// `env` instead of the process environment when given
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("cors.allowed_origins")
            .source(env);

        Config::builder()
            .add_source(file)
            .add_source(environment)
            .build()
            .and_then(|config| config.try_deserialize::<Self>())
            .map_err(|e| ServiceError::ConfigError(e.to_string()))
    }

    /// Apply the variables the service has always honoured: `PORT`,
    /// `SQLITE_DB_PATH` and `API_KEYS` (`key1:client1,key2:client2`)
    ///
    /// # Errors
    ///
    /// Fails when `PORT` is not a valid port number.
    pub fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ServiceError::ConfigError(format!("invalid PORT value '{port}'")))?;
        }

        if let Some(path) = lookup("SQLITE_DB_PATH").filter(|p| !p.trim().is_empty()) {
            self.storage.sqlite_path = PathBuf::from(path.trim());
        }

        if let Some(raw) = lookup("API_KEYS") {
            self.auth.api_keys.extend(parse_api_keys(&raw));
        }

        Ok(())
    }

    /// Apply command line overrides
    pub fn apply_overrides(&mut self, host: Option<String>, port: Option<u16>, verbose: bool) {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        if verbose {
            self.logging.level = "debug".to_string();
        }
    }

    /// Build the API key registry
    ///
    /// With no keys configured this fails, unless the insecure development
    /// key is explicitly allowed, in which case it is installed with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Fails when no keys are configured and the insecure default is off.
    pub fn api_keys(&self) -> Result<ApiKeys> {
        let mut keys = ApiKeys::new();
        for entry in &self.auth.api_keys {
            keys.insert(entry.key.clone(), entry.client.clone());
        }

        if !keys.is_empty() {
            return Ok(keys);
        }

        if self.auth.allow_insecure_default_key {
            warn!(
                key = INSECURE_DEFAULT_KEY,
                client = INSECURE_DEFAULT_CLIENT,
                "No API keys configured: accepting the insecure default development key. \
                 Never enable auth.allow_insecure_default_key in production"
            );
            return Ok(ApiKeys::insecure_default());
        }

        Err(ServiceError::ConfigError(
            "no API keys configured: set auth.api_keys or API_KEYS, or enable \
             auth.allow_insecure_default_key for local development"
                .to_string(),
        ))
    }
}

/// Parse `key1:client1,key2:client2`, skipping malformed entries
pub fn parse_api_keys(raw: &str) -> Vec<ApiKeySetting> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, client) = pair.split_once(':')?;
            let (key, client) = (key.trim(), client.trim());
            if key.is_empty() || client.is_empty() {
                warn!("Ignoring malformed API_KEYS entry");
                return None;
            }
            Some(ApiKeySetting {
                key: key.to_string(),
                client: client.to_string(),
            })
        })
        .collect()
}
