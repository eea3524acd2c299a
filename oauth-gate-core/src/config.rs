use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::oauth2::descriptor;
use crate::oauth2::settings::SERVER_BASE_URL;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    /// Provider options keyed by provider key, then option name
    ///
    /// ```yaml
    /// auth:
    ///   google:
    ///     enabled: "true"
    ///     client_id: "..."
    /// ```
    pub auth: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public URL users reach the server at; callback URLs are built from it
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            base_url: "http://localhost:9000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    ///
    /// Environment keys use `__` between levels, e.g.
    /// `OAUTH_GATE_AUTH__GOOGLE__CLIENT_ID`.
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("OAUTH_GATE")
                .prefix_separator("_")
                .separator("__"),
        );

        builder.build()?.try_deserialize()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Flatten into settings-store entries (`auth.<provider>.<option>`)
    #[must_use]
    pub fn settings_entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .auth
            .iter()
            .flat_map(|(provider, options)| {
                options
                    .iter()
                    .map(move |(option, value)| (format!("auth.{provider}.{option}"), value.clone()))
            })
            .collect();
        entries.push((SERVER_BASE_URL.to_string(), self.server.base_url.clone()));
        entries
    }

    /// Collect every misconfiguration instead of stopping at the first
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must not be 0".to_string());
        }
        match url::Url::parse(&self.server.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "server.base_url must be http or https, got {}",
                url.scheme()
            )),
            Err(e) => errors.push(format!("server.base_url is not a valid URL: {e}")),
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be json or pretty, got {}",
                self.logging.format
            ));
        }
        for provider in self.auth.keys() {
            if descriptor::by_key(provider).is_none() {
                errors.push(format!("auth.{provider}: unknown provider"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
