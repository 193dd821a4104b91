//! API key registry
//!
//! Callers authenticate with `Authorization: Bearer <key>`. Keys are held as
//! [`SecretString`] so they never show up in `Debug` output, and lookups
//! compare against every configured key in constant time.

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

/// Key installed when the insecure development fallback is enabled
pub const INSECURE_DEFAULT_KEY: &str = "dev-api-key";
/// Client id attached to the insecure development key
pub const INSECURE_DEFAULT_CLIENT: &str = "development";

/// Identity of an authenticated caller, attached to the request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub client_id: String,
}

#[derive(Debug)]
struct ApiKeyEntry {
    key: SecretString,
    client_id: String,
}

/// Configured API keys and the client each one identifies
#[derive(Debug, Default)]
pub struct ApiKeys {
    entries: Vec<ApiKeyEntry>,
}

impl ApiKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` for `client_id`; empty keys are ignored
    pub fn insert(&mut self, key: impl Into<String>, client_id: impl Into<String>) {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        self.entries.push(ApiKeyEntry {
            key: SecretString::new(key),
            client_id: client_id.into(),
        });
    }

    pub fn with_key(mut self, key: impl Into<String>, client_id: impl Into<String>) -> Self {
        self.insert(key, client_id);
        self
    }

    /// The development fallback key set
    pub fn insecure_default() -> Self {
        Self::new().with_key(INSECURE_DEFAULT_KEY, INSECURE_DEFAULT_CLIENT)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a presented key to its client
    ///
    /// Every entry is compared so the time taken does not depend on which
    /// key matched.
    pub fn resolve(&self, presented: &str) -> Option<ClientIdentity> {
        let mut matched: Option<&ApiKeyEntry> = None;
        for entry in &self.entries {
            let equal: bool = entry
                .key
                .expose_secret()
                .as_bytes()
                .ct_eq(presented.as_bytes())
                .into();
            if equal && matched.is_none() {
                matched = Some(entry);
            }
        }

        matched.map(|entry| ClientIdentity {
            client_id: entry.client_id.clone(),
        })
    }

    /// Raw keys, for scrubbing them from log output
    pub fn secrets(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.key.expose_secret().clone())
            .collect()
    }
}
