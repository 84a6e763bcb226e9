//! Application configuration
//!
//! Read from an optional TOML file; `MM_BACKEND_URL` overrides the backend
//! URL. A missing file means defaults.

use std::path::Path;

use anyhow::Context;
use mm_client::ClientConfig;
use mm_core::OrchestratorConfig;
use serde::{Deserialize, Serialize};

/// Environment variable overriding `backend.base_url`
pub(crate) const BACKEND_URL_ENV: &str = "MM_BACKEND_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) backend: ClientConfig,
    pub(crate) orchestrator: OrchestratorConfig,
}

impl AppConfig {
    /// Load from `path` (if any) and apply the environment override
    pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                Self::from_toml(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.override_backend_url(std::env::var(BACKEND_URL_ENV).ok());
        Ok(config)
    }

    pub(crate) fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Replace the backend URL when `url` is set and non-blank
    pub(crate) fn override_backend_url(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            tracing::debug!("backend url overridden: {url}");
            self.backend.base_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(AppConfig::from_toml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_sections() {
        let config = AppConfig::from_toml(
            r#"
            [backend]
            base_url = "https://mm.example.com"

            [orchestrator]
            poll_interval_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "https://mm.example.com");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.orchestrator.poll_interval_ms, 500);
        assert_eq!(config.orchestrator.sample_size, 1000);
    }

    #[test]
    fn env_override_wins_unless_blank() {
        let mut config = AppConfig::default();
        config.override_backend_url(Some("  ".to_string()));
        assert_eq!(config.backend.base_url, "http://localhost:8080");
        config.override_backend_url(Some("http://10.0.0.5:8080".to_string()));
        assert_eq!(config.backend.base_url, "http://10.0.0.5:8080");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/migration-mind.toml"))).unwrap_err();
        assert!(err.to_string().contains("reading config file"));
    }
}
