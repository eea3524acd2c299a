//! Configuration loading and settings seeding

use std::path::Path;

use anyhow::Result;

use crate::config::AppConfig;
use crate::oauth2::descriptor;
use crate::oauth2::settings::ProviderSettings;
use crate::settings::MemorySettings;

/// Load configuration from config file or environment variables
///
/// Config file search order:
/// 1. `OAUTH_GATE_CONFIG_PATH` environment variable (explicit path)
/// 2. ./config.yaml (current working directory)
/// 3. Fall back to environment variables only
///
/// Runs before logging is initialized, hence `eprintln!`.
pub fn load_config() -> Result<AppConfig> {
    let config_path = std::env::var("OAUTH_GATE_CONFIG_PATH")
        .ok()
        .filter(|p| Path::new(p).exists())
        .or_else(|| Path::new("config.yaml").exists().then(|| "config.yaml".to_string()));

    let config = match config_path {
        Some(path) => {
            eprintln!("Loading config from {path}");
            AppConfig::from_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load {path}: {e}"))?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            AppConfig::from_env()?
        }
    };

    if let Err(errors) = config.validate() {
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    Ok(config)
}

/// Settings store holding every provider default, overridden by `config`
#[must_use]
pub fn seed_settings(config: &AppConfig) -> MemorySettings {
    let settings = MemorySettings::with_definitions(
        descriptor::all()
            .into_iter()
            .flat_map(ProviderSettings::definitions),
    );
    settings.extend(config.settings_entries());
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::collections::HashMap;

    #[test]
    fn test_seed_settings() {
        let mut config = AppConfig::default();
        config.auth.insert(
            "google".to_string(),
            HashMap::from([("client_id".to_string(), "the_id".to_string())]),
        );

        let settings = seed_settings(&config);
        assert_eq!(settings.get_string("auth.google.client_id").as_deref(), Some("the_id"));
        assert_eq!(settings.get_string("auth.bitbucket.login_strategy").as_deref(), Some("Unique"));
        assert!(settings.get_bool("auth.bitbucket.allow_users_to_sign_up"));
        assert!(!settings.get_bool("auth.google.enabled"));
        assert_eq!(
            settings.get_string("server.base_url").as_deref(),
            Some("http://localhost:9000")
        );
    }
}
