// Sanitization of messages that leave the process

mod patterns {
    #![allow(clippy::unwrap_used)]
    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        pub static ref FILE_PATH_REGEX: Regex =
            Regex::new(r"(?:[A-Za-z]:)?(?:[/\\][\w.\-]+){2,}").unwrap();
        pub static ref BEARER_REGEX: Regex =
            Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+").unwrap();
        pub static ref SECRET_ASSIGNMENT_REGEX: Regex = Regex::new(
            r"(?i)\b(password|passwd|secret|token|api_key|apikey)\s*[=:]\s*[^\s,;&]+"
        )
        .unwrap();
    }
}

use patterns::{BEARER_REGEX, FILE_PATH_REGEX, SECRET_ASSIGNMENT_REGEX};

/// Generic message shown to clients in place of internal diagnostics
pub const GENERIC_INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Strips storage and validator diagnostics from internal error messages
#[derive(Debug, Clone, Default)]
pub struct DataSanitizer {
    expose_internal_details: bool,
}

impl DataSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep internal diagnostics in client-facing messages (development only)
    pub fn with_internal_details(mut self, expose: bool) -> Self {
        self.expose_internal_details = expose;
        self
    }

    /// Message safe to return to a client for an internal failure
    pub fn public_message(&self, internal: &str) -> String {
        if self.expose_internal_details {
            self.sanitize_for_logging(internal)
        } else {
            GENERIC_INTERNAL_MESSAGE.to_string()
        }
    }

    /// Collapse multi-line diagnostics (driver errors, backtraces) to their
    /// first line and scrub filesystem paths and credentials from it
    pub fn sanitize_for_logging(&self, data: &str) -> String {
        let first_line = data.lines().next().map(str::trim).unwrap_or_default();
        let scrubbed = BEARER_REGEX.replace_all(first_line, "Bearer [REDACTED]");
        let scrubbed = SECRET_ASSIGNMENT_REGEX.replace_all(&scrubbed, "$1=[REDACTED]");
        FILE_PATH_REGEX.replace_all(&scrubbed, "[PATH]").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_details_hidden_by_default() {
        let sanitizer = DataSanitizer::new();
        assert_eq!(
            sanitizer.public_message("error returned from database: disk I/O error"),
            GENERIC_INTERNAL_MESSAGE
        );
    }

    #[test]
    fn test_first_line_only_when_exposed() {
        let sanitizer = DataSanitizer::new().with_internal_details(true);
        assert_eq!(
            sanitizer.public_message("database is locked\n  at sqlite3_step\n  at ..."),
            "database is locked"
        );
    }

    #[test]
    fn test_paths_and_credentials_are_scrubbed() {
        let sanitizer = DataSanitizer::new();
        let cleaned = sanitizer.sanitize_for_logging(
            "unable to open database file /var/lib/confman/config.db (password=hunter2, Bearer abc.def)",
        );

        assert!(!cleaned.contains("/var/lib/confman"));
        assert!(!cleaned.contains("hunter2"));
        assert!(!cleaned.contains("abc.def"));
        assert!(cleaned.contains("[PATH]"));
        assert!(cleaned.contains("password=[REDACTED]"));
        assert!(cleaned.contains("Bearer [REDACTED]"));
    }

    #[test]
    fn test_plain_messages_pass_through() {
        let sanitizer = DataSanitizer::new();
        assert_eq!(
            sanitizer.sanitize_for_logging("database is locked"),
            "database is locked"
        );
    }
}
