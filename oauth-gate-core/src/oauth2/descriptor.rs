//! Static description of each supported identity provider
//!
//! Google and Bitbucket only differ by endpoints, scope and a handful of
//! switches, so both are plain values of [`ProviderDescriptor`] driving a
//! single flow implementation.

use reqwest::Method;
use serde::Serialize;

/// Which configured base URL an endpoint path is appended to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseUrl {
    Api,
    Web,
}

/// Endpoint relative to one of the provider's base URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub base: BaseUrl,
    pub path: &'static str,
}

/// Profile field holding the provider-side login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Username,
}

/// Login button metadata for the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Display {
    pub icon_path: &'static str,
    pub background_color: &'static str,
}

#[derive(Debug)]
pub struct ProviderDescriptor {
    /// Short identifier, used in settings keys and unique logins
    pub key: &'static str,
    pub name: &'static str,
    pub required_scope: &'static str,
    pub default_api_url: &'static str,
    pub default_web_url: &'static str,
    pub authorize: Endpoint,
    pub token: Endpoint,
    pub token_method: Method,
    pub profile: Endpoint,
    /// Secondary emails listing, fetched best-effort after the profile
    pub emails: Option<Endpoint>,
    pub login_field: LoginField,
    /// Provider is only enabled once a login strategy is configured
    pub requires_login_strategy: bool,
    pub sends_csrf_state: bool,
    /// Append `hd=<domain>` to the authorization URL when one domain is allowed
    pub sends_hosted_domain_hint: bool,
    pub display: Display,
}

impl ProviderDescriptor {
    /// Label of the "keep the provider login" strategy shown to administrators
    #[must_use]
    pub fn provider_login_label(&self) -> String {
        format!("Same as {} login", self.name)
    }

    #[must_use]
    pub fn settings_key(&self, option: &str) -> String {
        format!("auth.{}.{option}", self.key)
    }
}

pub static GOOGLE: ProviderDescriptor = ProviderDescriptor {
    key: "google",
    name: "Google",
    required_scope: "openid email",
    default_api_url: "https://www.googleapis.com/",
    default_web_url: "https://accounts.google.com/",
    authorize: Endpoint {
        base: BaseUrl::Web,
        path: "o/oauth2/v2/auth",
    },
    token: Endpoint {
        base: BaseUrl::Api,
        path: "oauth2/v3/token",
    },
    token_method: Method::POST,
    profile: Endpoint {
        base: BaseUrl::Api,
        path: "oauth2/v1/userinfo",
    },
    emails: None,
    login_field: LoginField::Email,
    requires_login_strategy: false,
    sends_csrf_state: true,
    sends_hosted_domain_hint: true,
    display: Display {
        icon_path: "/static/authgoogle/google.svg",
        background_color: "#236487",
    },
};

pub static BITBUCKET: ProviderDescriptor = ProviderDescriptor {
    key: "bitbucket",
    name: "Bitbucket",
    required_scope: "account",
    default_api_url: "https://api.bitbucket.org/",
    default_web_url: "https://bitbucket.org/",
    authorize: Endpoint {
        base: BaseUrl::Web,
        path: "site/oauth2/authorize",
    },
    token: Endpoint {
        base: BaseUrl::Web,
        path: "site/oauth2/access_token",
    },
    token_method: Method::POST,
    profile: Endpoint {
        base: BaseUrl::Api,
        path: "2.0/user",
    },
    emails: Some(Endpoint {
        base: BaseUrl::Api,
        path: "2.0/user/emails",
    }),
    login_field: LoginField::Username,
    requires_login_strategy: true,
    sends_csrf_state: false,
    sends_hosted_domain_hint: false,
    display: Display {
        icon_path: "/static/authbitbucket/bitbucket.svg",
        background_color: "#205081",
    },
};

/// All supported providers
#[must_use]
pub fn all() -> [&'static ProviderDescriptor; 2] {
    [&GOOGLE, &BITBUCKET]
}

/// Look up a provider by key
#[must_use]
pub fn by_key(key: &str) -> Option<&'static ProviderDescriptor> {
    all().into_iter().find(|d| d.key == key)
}
