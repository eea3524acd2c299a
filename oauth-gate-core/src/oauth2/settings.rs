//! Typed, per-read view over one provider's options
//!
//! Nothing is cached: each accessor goes back to the [`Settings`] store.

use oauth2::{ClientId, ClientSecret};

use super::descriptor::{BaseUrl, Endpoint, ProviderDescriptor};
use super::identity::LoginStrategy;
use crate::settings::{PropertyDefinition, PropertyType, Settings};
use crate::{Error, Result};

pub const ENABLED: &str = "enabled";
pub const CLIENT_ID: &str = "client_id";
pub const CLIENT_SECRET: &str = "client_secret";
pub const ALLOW_USERS_TO_SIGN_UP: &str = "allow_users_to_sign_up";
pub const LOGIN_STRATEGY: &str = "login_strategy";
pub const LIMIT_DOMAIN: &str = "limit_domain";
pub const API_URL: &str = "api_url";
pub const WEB_URL: &str = "web_url";

/// Host-wide public URL of the server, used for the unauthorized page
pub const SERVER_BASE_URL: &str = "server.base_url";

pub struct ProviderSettings<'a> {
    descriptor: &'static ProviderDescriptor,
    settings: &'a dyn Settings,
}

impl<'a> ProviderSettings<'a> {
    #[must_use]
    pub fn new(descriptor: &'static ProviderDescriptor, settings: &'a dyn Settings) -> Self {
        Self {
            descriptor,
            settings,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &'static ProviderDescriptor {
        self.descriptor
    }

    fn string(&self, option: &str) -> Option<String> {
        self.settings
            .get_string(&self.descriptor.settings_key(option))
            .filter(|v| !v.trim().is_empty())
    }

    #[must_use]
    pub fn client_id(&self) -> Option<ClientId> {
        self.string(CLIENT_ID).map(ClientId::new)
    }

    #[must_use]
    pub fn client_secret(&self) -> Option<ClientSecret> {
        self.string(CLIENT_SECRET).map(ClientSecret::new)
    }

    /// Raw login strategy value; parsed by the identity mapper
    #[must_use]
    pub fn login_strategy(&self) -> Option<String> {
        self.string(LOGIN_STRATEGY)
    }

    pub fn is_enabled(&self) -> bool {
        self.settings
            .get_bool(&self.descriptor.settings_key(ENABLED))
            && self.client_id().is_some()
            && self.client_secret().is_some()
            && (!self.descriptor.requires_login_strategy || self.login_strategy().is_some())
    }

    /// Fails closed with a configuration error when the provider is disabled
    pub fn ensure_enabled(&self) -> Result<()> {
        if self.is_enabled() {
            Ok(())
        } else {
            Err(Error::disabled(self.descriptor.name))
        }
    }

    pub fn allow_users_to_sign_up(&self) -> bool {
        self.settings
            .get_bool(&self.descriptor.settings_key(ALLOW_USERS_TO_SIGN_UP))
    }

    #[must_use]
    pub fn api_url(&self) -> String {
        with_ending_slash(
            self.string(API_URL)
                .unwrap_or_else(|| self.descriptor.default_api_url.to_string()),
        )
    }

    #[must_use]
    pub fn web_url(&self) -> String {
        with_ending_slash(
            self.string(WEB_URL)
                .unwrap_or_else(|| self.descriptor.default_web_url.to_string()),
        )
    }

    /// Absolute URL of a descriptor endpoint
    #[must_use]
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        let base = match endpoint.base {
            BaseUrl::Api => self.api_url(),
            BaseUrl::Web => self.web_url(),
        };
        format!("{base}{}", endpoint.path)
    }

    /// Configured domain restriction, verbatim
    #[must_use]
    pub fn allowed_domain(&self) -> Option<String> {
        self.string(LIMIT_DOMAIN).map(|v| v.trim().to_string())
    }

    /// Allowed domains, split on commas
    #[must_use]
    pub fn allowed_domains(&self) -> Vec<String> {
        self.allowed_domain()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn unauthorized_url(&self) -> String {
        let base = self
            .settings
            .get_string(SERVER_BASE_URL)
            .unwrap_or_default();
        format!("{}/sessions/unauthorized#", base.trim_end_matches('/'))
    }

    /// Option declarations with their defaults
    #[must_use]
    pub fn definitions(descriptor: &'static ProviderDescriptor) -> Vec<PropertyDefinition> {
        let name = descriptor.name;
        let unique = LoginStrategy::Unique.label(descriptor);
        let same_login = LoginStrategy::ProviderLogin.label(descriptor);

        vec![
            PropertyDefinition {
                key: descriptor.settings_key(ENABLED),
                name: "Enabled",
                description: format!(
                    "Enable {name} users to login. Value is ignored if client ID and secret are not defined."
                ),
                property_type: PropertyType::Boolean,
                default_value: Some(false.to_string()),
            },
            PropertyDefinition {
                key: descriptor.settings_key(CLIENT_ID),
                name: "OAuth client ID",
                description: format!("The Client ID provided by {name} when registering the application."),
                property_type: PropertyType::String,
                default_value: None,
            },
            PropertyDefinition {
                key: descriptor.settings_key(CLIENT_SECRET),
                name: "OAuth client secret",
                description: format!("Client Secret provided by {name} when registering the application."),
                property_type: PropertyType::Password,
                default_value: None,
            },
            PropertyDefinition {
                key: descriptor.settings_key(ALLOW_USERS_TO_SIGN_UP),
                name: "Allow users to sign-up",
                description: "Allow new users to authenticate. When set to 'false', only existing users will be able to authenticate to the server.".to_string(),
                property_type: PropertyType::Boolean,
                default_value: Some(true.to_string()),
            },
            PropertyDefinition {
                key: descriptor.settings_key(LOGIN_STRATEGY),
                name: "Login generation strategy",
                description: format!(
                    "When set to '{unique}', the user's login is suffixed with '@{}' so that it is unique. \
                     When set to '{same_login}', the user's login is the {name} login.",
                    descriptor.key
                ),
                property_type: PropertyType::SingleSelect(vec![unique.clone(), same_login]),
                default_value: Some(unique),
            },
            PropertyDefinition {
                key: descriptor.settings_key(LIMIT_DOMAIN),
                name: "Allowed domain(s)",
                description: "When set, only users whose email belongs to one of these domains (comma-separated) can authenticate.".to_string(),
                property_type: PropertyType::String,
                default_value: None,
            },
            PropertyDefinition {
                key: descriptor.settings_key(API_URL),
                name: "API URL",
                description: format!("Base URL of the {name} API."),
                property_type: PropertyType::String,
                default_value: Some(descriptor.default_api_url.to_string()),
            },
            PropertyDefinition {
                key: descriptor.settings_key(WEB_URL),
                name: "Web URL",
                description: format!("Base URL of the {name} login pages."),
                property_type: PropertyType::String,
                default_value: Some(descriptor.default_web_url.to_string()),
            },
        ]
    }
}

fn with_ending_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
