// Logger configuration
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format of the console layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for development terminals
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
    /// Directory for daily-rolling JSON log files; console only when unset
    pub directory: Option<PathBuf>,
    /// File name prefix for rolled log files
    pub file_prefix: String,
    /// Strip credentials from logged request metadata
    pub redaction_enabled: bool,
}

impl LoggerConfig {
    /// Filter directive used when `RUST_LOG` is absent
    pub fn filter_directive(&self) -> String {
        format!(
            "{},tower_http=info,sqlx=warn,hyper=info",
            self.level.trim().to_lowercase()
        )
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            directory: None,
            file_prefix: "confman.log".to_string(),
            redaction_enabled: true,
        }
    }
}
