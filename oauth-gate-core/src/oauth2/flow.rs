//! Authorization Code flow driver
//!
//! One controller per provider. The host supplies the request-scoped side
//! effects through [`InitContext`] and [`CallbackContext`]; the controller
//! owns protocol sequencing:
//!
//! ```text
//! init:     enabled? -> [state] -> authorization URL -> redirect
//! callback: enabled? -> [verify state] -> code -> token -> profile -> [emails]
//!           -> identity -> domain policy -> authenticate + redirect | unauthorized redirect
//! ```

use std::sync::Arc;

use oauth2::{AuthorizationCode, CsrfToken};
use tracing::{debug, info, warn};

use super::authorize::AuthorizationUrlBuilder;
use super::descriptor::{Display, ProviderDescriptor};
use super::identity::{IdentityMapper, NormalizedIdentity};
use super::profile::ProfileFetcher;
use super::settings::ProviderSettings;
use super::token::TokenExchangeClient;
use super::transport::HttpTransport;
use crate::settings::Settings;
use crate::{Error, Result};

/// Host side of the `init` phase
#[cfg_attr(test, mockall::automock)]
pub trait InitContext {
    /// Absolute URL the provider redirects back to
    fn callback_url(&self) -> String;

    /// Issue an anti-forgery state bound to the user agent
    ///
    /// Only called for providers that send one. `None` skips the parameter.
    fn generate_csrf_state(&mut self) -> Option<String>;

    fn redirect_to(&mut self, url: &str) -> Result<()>;
}

/// Host side of the `callback` phase
#[cfg_attr(test, mockall::automock)]
pub trait CallbackContext: Send {
    fn callback_url(&self) -> String;

    fn request_parameter(&self, name: &str) -> Option<String>;

    /// Check the `state` parameter against the one issued during `init`
    fn verify_csrf_state(&mut self) -> Result<()>;

    /// Register the user as logged in
    fn authenticate(&mut self, identity: &NormalizedIdentity) -> Result<()>;

    fn redirect_to(&mut self, url: &str) -> Result<()>;

    /// Send the user back to the page that started the login
    fn redirect_to_requested_page(&mut self) -> Result<()>;
}

/// Non-error end states of a callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Identity registered with the host
    Authenticated(NormalizedIdentity),
    /// Email outside the allowed domains; nothing registered
    Unauthorized {
        provider_login: String,
        email: Option<String>,
    },
}

#[derive(Clone)]
pub struct AuthFlowController {
    descriptor: &'static ProviderDescriptor,
    settings: Arc<dyn Settings>,
    transport: Arc<dyn HttpTransport>,
}

impl AuthFlowController {
    #[must_use]
    pub fn new(
        descriptor: &'static ProviderDescriptor,
        settings: Arc<dyn Settings>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            descriptor,
            settings,
            transport,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &'static ProviderDescriptor {
        self.descriptor
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.descriptor.key
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.descriptor.name
    }

    #[must_use]
    pub const fn display(&self) -> Display {
        self.descriptor.display
    }

    fn provider_settings(&self) -> ProviderSettings<'_> {
        ProviderSettings::new(self.descriptor, self.settings.as_ref())
    }

    /// Re-evaluated on every call
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.provider_settings().is_enabled()
    }

    #[must_use]
    pub fn allows_users_to_sign_up(&self) -> bool {
        self.provider_settings().allow_users_to_sign_up()
    }

    /// Redirect the user agent to the provider's authorization endpoint
    pub fn init<C>(&self, ctx: &mut C) -> Result<()>
    where
        C: InitContext + ?Sized,
    {
        let settings = self.provider_settings();
        settings.ensure_enabled()?;

        let callback_url = ctx.callback_url();
        let mut builder = AuthorizationUrlBuilder::for_provider(&settings, &callback_url)?;
        if self.descriptor.sends_csrf_state {
            if let Some(state) = ctx.generate_csrf_state() {
                builder = builder.state(CsrfToken::new(state));
            }
        }

        debug!(provider = self.key(), %callback_url, "Redirecting to authorization endpoint");
        ctx.redirect_to(&builder.build())
    }

    /// Complete the login from the provider's redirect
    ///
    /// Provider calls run one after another. Any failure before the domain
    /// check aborts with no identity registered and no redirect issued.
    pub async fn callback<C>(&self, ctx: &mut C) -> Result<CallbackOutcome>
    where
        C: CallbackContext + ?Sized,
    {
        let descriptor = self.descriptor;
        let settings = self.provider_settings();
        settings.ensure_enabled()?;

        if descriptor.sends_csrf_state {
            ctx.verify_csrf_state()?;
        }

        let code = ctx
            .request_parameter("code")
            .filter(|code| !code.is_empty())
            .map(AuthorizationCode::new)
            .ok_or_else(|| {
                Error::Authentication(format!(
                    "{} callback is missing the authorization code",
                    descriptor.name
                ))
            })?;
        let callback_url = ctx.callback_url();

        let transport = self.transport.as_ref();
        let token = TokenExchangeClient::new(&settings, transport)
            .exchange(&code, &callback_url)
            .await?;

        let fetcher = ProfileFetcher::new(&settings, transport);
        let profile = fetcher.fetch_profile(&token).await?;
        let emails = fetcher.fetch_emails(&token).await?;

        let identity = IdentityMapper::from_setting(descriptor, settings.login_strategy().as_deref())?
            .map(&profile, emails.as_ref())?;

        let domains = settings.allowed_domains();
        if !is_email_allowed(identity.email.as_deref(), &domains) {
            warn!(
                provider = descriptor.key,
                login = %identity.provider_login,
                email = ?identity.email,
                allowed = ?domains,
                "Email is not in an allowed domain"
            );
            ctx.redirect_to(&settings.unauthorized_url())?;
            return Ok(CallbackOutcome::Unauthorized {
                provider_login: identity.provider_login,
                email: identity.email,
            });
        }

        ctx.authenticate(&identity)?;
        ctx.redirect_to_requested_page()?;
        info!(provider = descriptor.key, login = %identity.login, "User authenticated");

        Ok(CallbackOutcome::Authenticated(identity))
    }
}

/// Allowed when no domain is configured; otherwise the email must end with
/// `@<domain>` for one of them (case-sensitive)
fn is_email_allowed(email: Option<&str>, domains: &[String]) -> bool {
    if domains.is_empty() {
        return true;
    }
    email.is_some_and(|email| {
        domains
            .iter()
            .any(|domain| email.ends_with(&format!("@{domain}")))
    })
}
