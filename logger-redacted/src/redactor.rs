use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

mod patterns {
    #![allow(clippy::unwrap_used)]
    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        pub static ref BEARER_REGEX: Regex =
            Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+").unwrap();
        pub static ref QUERY_KEY_REGEX: Regex =
            Regex::new(r"(?i)\b(api_key|apikey|token|access_token)=[^&\s]+").unwrap();
    }
}

use patterns::{BEARER_REGEX, QUERY_KEY_REGEX};

/// Credential redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_bearer_tokens: bool,
    pub redact_query_credentials: bool,
    /// Replace credentials with a short hash so repeated use can be correlated
    pub hash_for_correlation: bool,
    /// Literal secrets (configured API keys) to scrub wherever they appear
    pub known_secrets: Vec<String>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_bearer_tokens: true,
            redact_query_credentials: true,
            hash_for_correlation: true,
            known_secrets: Vec::new(),
        }
    }
}

/// Scrubs API keys and bearer tokens from text before it is logged
#[derive(Debug, Clone, Default)]
pub struct CredentialRedactor {
    config: RedactionConfig,
}

impl CredentialRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    /// A redactor that leaves text untouched
    pub fn disabled() -> Self {
        Self::new(RedactionConfig {
            redact_bearer_tokens: false,
            redact_query_credentials: false,
            hash_for_correlation: false,
            known_secrets: Vec::new(),
        })
    }

    pub fn with_known_secrets(mut self, secrets: impl IntoIterator<Item = String>) -> Self {
        self.config
            .known_secrets
            .extend(secrets.into_iter().filter(|s| !s.is_empty()));
        self
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_bearer_tokens {
            result = BEARER_REGEX
                .replace_all(&result, |caps: &regex::Captures| {
                    format!("Bearer {}", self.mask(&caps[0]))
                })
                .to_string();
        }

        if self.config.redact_query_credentials {
            result = QUERY_KEY_REGEX
                .replace_all(&result, |caps: &regex::Captures| {
                    format!("{}={}", &caps[1], self.mask(&caps[0]))
                })
                .to_string();
        }

        for secret in &self.config.known_secrets {
            if result.contains(secret.as_str()) {
                result = result.replace(secret.as_str(), &self.mask(secret));
            }
        }

        result
    }

    /// Correlation tag for a credential, never the credential itself
    pub fn fingerprint(&self, credential: &str) -> String {
        hash_value(credential)
    }

    fn mask(&self, value: &str) -> String {
        if self.config.hash_for_correlation {
            format!("[REDACTED:{}]", hash_value(value))
        } else {
            "[REDACTED]".to_string()
        }
    }
}

fn hash_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    general_purpose::STANDARD_NO_PAD.encode(result.get(..8).unwrap_or_default())
}
