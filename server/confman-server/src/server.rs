use crate::auth::ApiKeys;
use crate::settings::{ServerSettings, StorageBackend};
use config_engine::{ConfigEngine, ConfigStore, MemoryStore};
use database_layer::{DatabaseConfig, SqliteConfigStore};
use error_common::{Result, ServiceError};
use logger_redacted::CredentialRedactor;
use std::sync::Arc;
use tracing::info;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct ConfmanServer {
    pub engine: Arc<ConfigEngine>,
    pub api_keys: Arc<ApiKeys>,
    /// Scrubs credentials from request metadata before it is logged
    pub redactor: Arc<CredentialRedactor>,
    /// Allowed CORS origins, `*` for any
    pub cors_origins: Arc<Vec<String>>,
}

impl ConfmanServer {
    pub fn new(store: Arc<dyn ConfigStore>, api_keys: ApiKeys) -> Self {
        let redactor = CredentialRedactor::default().with_known_secrets(api_keys.secrets());
        Self {
            engine: Arc::new(ConfigEngine::new(store)),
            api_keys: Arc::new(api_keys),
            redactor: Arc::new(redactor),
            cors_origins: Arc::new(vec!["*".to_string()]),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Arc::new(origins);
        self
    }

    pub fn with_redactor(mut self, redactor: CredentialRedactor) -> Self {
        self.redactor = Arc::new(redactor);
        self
    }

    /// Open the configured store and resolve API keys
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be opened or no usable API keys are
    /// configured.
    pub async fn from_settings(settings: &ServerSettings) -> Result<Self> {
        let api_keys = settings.api_keys()?;
        let store = open_store(settings).await?;

        let redactor = if settings.logging.redaction_enabled {
            CredentialRedactor::default().with_known_secrets(api_keys.secrets())
        } else {
            CredentialRedactor::disabled()
        };

        info!(
            backend = store.backend_name(),
            api_keys = api_keys.len(),
            "Configuration engine ready"
        );

        Ok(Self::new(store, api_keys)
            .with_redactor(redactor)
            .with_cors_origins(settings.cors.allowed_origins.clone()))
    }
}

async fn open_store(settings: &ServerSettings) -> Result<Arc<dyn ConfigStore>> {
    match settings.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage; configurations are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Sqlite => {
            let config = DatabaseConfig {
                path: settings.storage.sqlite_path.clone(),
                max_connections: settings.storage.max_connections,
                ..DatabaseConfig::default()
            };
            let store = SqliteConfigStore::connect(&config)
                .await
                .map_err(|e| ServiceError::StorageError(e.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}
