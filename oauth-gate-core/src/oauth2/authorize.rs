//! Authorization endpoint URL construction
//!
//! Parameter order is fixed:
//! `response_type, client_id, redirect_uri, scope[, state][, hd]`.

use oauth2::{ClientId, CsrfToken};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::settings::ProviderSettings;
use crate::{Error, Result};

/// Everything but RFC 3986 unreserved characters; spaces become `%20`
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub(crate) fn oauth_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

#[derive(Debug)]
pub struct AuthorizationUrlBuilder {
    endpoint: String,
    client_id: ClientId,
    callback_url: String,
    scope: String,
    state: Option<CsrfToken>,
    hosted_domain: Option<String>,
}

impl AuthorizationUrlBuilder {
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        client_id: ClientId,
        callback_url: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            client_id,
            callback_url: callback_url.into(),
            scope: scope.into(),
            state: None,
            hosted_domain: None,
        }
    }

    /// Builder for the provider's authorization endpoint with its required scope
    ///
    /// Fails with a configuration error while the provider is disabled.
    pub fn for_provider(settings: &ProviderSettings<'_>, callback_url: &str) -> Result<Self> {
        let descriptor = settings.descriptor();
        settings.ensure_enabled()?;
        let client_id = settings
            .client_id()
            .ok_or_else(|| Error::disabled(descriptor.name))?;

        let mut builder = Self::new(
            settings.endpoint_url(descriptor.authorize),
            client_id,
            callback_url,
            descriptor.required_scope,
        );

        if descriptor.sends_hosted_domain_hint {
            if let [domain] = settings.allowed_domains().as_slice() {
                builder = builder.hosted_domain(domain.clone());
            }
        }

        Ok(builder)
    }

    #[must_use]
    pub fn state(mut self, state: CsrfToken) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn hosted_domain(mut self, domain: impl Into<String>) -> Self {
        self.hosted_domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn build(&self) -> String {
        let mut url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}",
            self.endpoint,
            self.client_id.as_str(),
            oauth_encode(&self.callback_url),
            oauth_encode(&self.scope),
        );

        if let Some(state) = &self.state {
            url.push_str("&state=");
            url.push_str(&oauth_encode(state.secret()));
        }

        if let Some(domain) = &self.hosted_domain {
            url.push_str("&hd=");
            url.push_str(domain);
        }

        url
    }
}
