//! User profile retrieval

use oauth2::AccessToken;
use serde::Deserialize;
use tracing::{debug, trace};

use super::descriptor::Endpoint;
use super::settings::ProviderSettings;
use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::{Error, Result};

/// Union of the profile fields returned by the supported providers
///
/// Google: `GET /oauth2/v1/userinfo`. Bitbucket: `GET /2.0/user`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfile {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub verified_email: Option<bool>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

impl RawProfile {
    /// Display name as sent by the provider, possibly empty
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref().or(self.name.as_deref())
    }

    /// Provider user id; Google sends it as a string, others as a number
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.id.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailEntry {
    pub email: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default, rename = "active")]
    pub is_active: bool,
}

/// Bitbucket `GET /2.0/user/emails` payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailList {
    #[serde(default, rename = "values")]
    pub emails: Vec<EmailEntry>,
}

impl EmailList {
    /// First address flagged primary
    #[must_use]
    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|entry| entry.is_primary)
            .map(|entry| entry.email.as_str())
    }
}

pub struct ProfileFetcher<'a> {
    settings: &'a ProviderSettings<'a>,
    transport: &'a dyn HttpTransport,
}

impl<'a> ProfileFetcher<'a> {
    #[must_use]
    pub fn new(settings: &'a ProviderSettings<'a>, transport: &'a dyn HttpTransport) -> Self {
        Self {
            settings,
            transport,
        }
    }

    async fn get(&self, endpoint: Endpoint, token: &AccessToken) -> Result<HttpResponse> {
        let request =
            HttpRequest::get(self.settings.endpoint_url(endpoint)).bearer(token.secret().as_str());
        self.transport.send(request).await
    }

    /// Fetch and decode the user profile; any non-2xx status is fatal
    pub async fn fetch_profile(&self, token: &AccessToken) -> Result<RawProfile> {
        let descriptor = self.settings.descriptor();
        let response = self.get(descriptor.profile, token).await?;

        if !response.is_success() {
            return Err(Error::ProviderProtocol {
                provider: descriptor.name.to_string(),
                resource: "user profile",
                status: response.status,
                body: response.body,
            });
        }

        trace!(provider = descriptor.key, body = %response.body, "User response received");
        serde_json::from_str(&response.body).map_err(|e| Error::Deserialization {
            context: format!("{} user profile: {e}", descriptor.name),
        })
    }

    /// Fetch the email list, if the provider has one
    ///
    /// Email enrichment is optional: a failed call yields `None`.
    pub async fn fetch_emails(&self, token: &AccessToken) -> Result<Option<EmailList>> {
        let descriptor = self.settings.descriptor();
        let Some(endpoint) = descriptor.emails else {
            return Ok(None);
        };

        let response = self.get(endpoint, token).await?;
        if !response.is_success() {
            debug!(
                provider = descriptor.key,
                status = response.status,
                "Emails request failed, continuing without email"
            );
            return Ok(None);
        }

        match serde_json::from_str(&response.body) {
            Ok(emails) => Ok(Some(emails)),
            Err(e) => {
                debug!(provider = descriptor.key, error = %e, "Unreadable emails response, continuing without email");
                Ok(None)
            }
        }
    }
}
