//! Authorization code → access token exchange

use oauth2::{AccessToken, AuthorizationCode};
use serde::Deserialize;
use tracing::debug;

use super::settings::ProviderSettings;
use super::transport::{HttpRequest, HttpTransport};
use crate::{Error, Result};

#[derive(Deserialize)]
struct TokenPayload {
    access_token: String,
}

pub struct TokenExchangeClient<'a> {
    settings: &'a ProviderSettings<'a>,
    transport: &'a dyn HttpTransport,
}

impl<'a> TokenExchangeClient<'a> {
    #[must_use]
    pub fn new(settings: &'a ProviderSettings<'a>, transport: &'a dyn HttpTransport) -> Self {
        Self {
            settings,
            transport,
        }
    }

    /// Exchange `code` for an access token
    ///
    /// Any non-2xx answer is fatal: a consumed or expired code cannot be replayed.
    pub async fn exchange(&self, code: &AuthorizationCode, callback_url: &str) -> Result<AccessToken> {
        let descriptor = self.settings.descriptor();
        let (Some(client_id), Some(client_secret)) =
            (self.settings.client_id(), self.settings.client_secret())
        else {
            return Err(Error::disabled(descriptor.name));
        };

        let url = self.settings.endpoint_url(descriptor.token);
        debug!(provider = descriptor.key, %url, "Exchanging authorization code");

        let request = HttpRequest::new(descriptor.token_method.clone(), url)
            .param("grant_type", "authorization_code")
            .param("code", code.secret().as_str())
            .param("redirect_uri", callback_url)
            .param("client_id", client_id.as_str())
            .param("client_secret", client_secret.secret().as_str());

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(Error::ProviderProtocol {
                provider: descriptor.name.to_string(),
                resource: "access token",
                status: response.status,
                body: response.body,
            });
        }

        parse_token(&response.body).ok_or_else(|| Error::Deserialization {
            context: format!("{} token response has no access_token", descriptor.name),
        })
    }
}

/// JSON first, then `application/x-www-form-urlencoded`
fn parse_token(body: &str) -> Option<AccessToken> {
    serde_json::from_str::<TokenPayload>(body)
        .ok()
        .or_else(|| serde_urlencoded::from_str::<TokenPayload>(body).ok())
        .filter(|payload| !payload.access_token.is_empty())
        .map(|payload| AccessToken::new(payload.access_token))
}
