//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `version_tag` is empty or contains whitespace
    /// - `origin` is not an absolute http(s) URL
    /// - `static_manifest` contains a blank entry
    /// - `default_document` is empty
    ///
    /// Returns `ConfigError::Missing` if `static_manifest` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.version_tag.is_empty() {
            return Err(invalid("version_tag", "must not be empty"));
        }
        if self.version_tag.chars().any(char::is_whitespace) {
            return Err(invalid("version_tag", "must not contain whitespace"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("origin", "scheme must be http or https")),
            Err(e) => return Err(invalid("origin", &e.to_string())),
        }

        if self.static_manifest.is_empty() {
            return Err(ConfigError::Missing {
                field: "static_manifest".into(),
                hint: "List the assets to pre-cache, e.g. WAYSTATION_STATIC_MANIFEST=[/,/index.html]".into(),
            });
        }
        if self.static_manifest.iter().any(|path| path.trim().is_empty()) {
            return Err(invalid("static_manifest", "entries must not be blank"));
        }

        if self.default_document.is_empty() {
            return Err(invalid("default_document", "must not be empty"));
        }
        if !self.static_manifest.contains(&self.default_document) {
            tracing::warn!(
                default_document = %self.default_document,
                "default_document is not in static_manifest; \
                 offline navigations fall back to it only once it has been cached"
            );
        }

        Ok(())
    }
}
