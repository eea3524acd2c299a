//! OAuth2 login endpoints
//!
//! Binds the flow controller's host contract to HTTP: redirects become
//! `303 See Other` responses, state tokens live in the [`LoginStateStore`]
//! and authenticated identities land in the [`UserRegistry`].
//!
//! [`LoginStateStore`]: crate::login_state::LoginStateStore
//! [`UserRegistry`]: crate::users::UserRegistry

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use oauth_gate_core::oauth2::{
    descriptor::Display, CallbackContext, CallbackOutcome, InitContext, NormalizedIdentity,
};
use oauth_gate_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AppError, AppResult, AppState};

pub fn create_oauth2_router() -> Router<AppState> {
    Router::new()
        .route("/api/providers", get(list_providers))
        .route("/oauth2/{provider}/init", get(init))
        .route("/oauth2/{provider}/callback", get(callback))
        .route("/sessions/unauthorized", get(unauthorized))
}

#[derive(Debug, Deserialize)]
pub struct InitQuery {
    /// Local page to come back to after login
    pub return_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub key: &'static str,
    pub name: &'static str,
    pub display: Display,
    pub allows_users_to_sign_up: bool,
    pub init_url: String,
}

/// Enabled providers, for rendering login buttons
///
/// GET /api/providers
pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<ProviderInfo>> {
    let providers = state
        .flows
        .iter()
        .filter(|flow| flow.is_enabled())
        .map(|flow| ProviderInfo {
            key: flow.key(),
            name: flow.name(),
            display: flow.display(),
            allows_users_to_sign_up: flow.allows_users_to_sign_up(),
            init_url: format!("/oauth2/{}/init", flow.key()),
        })
        .collect();

    Json(providers)
}

/// Start a login
///
/// GET /oauth2/:provider/init?return_to=<path>
///
/// `return_to` is honored only by providers that send a state token; the
/// others always land on `/`.
pub async fn init(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<InitQuery>,
) -> AppResult<Redirect> {
    let flow = state.flow(&provider)?;
    let return_to = match query.return_to {
        Some(_) if !flow.descriptor().sends_csrf_state => {
            debug!(provider = flow.key(), "Ignoring return_to, provider sends no state");
            None
        }
        return_to => return_to.filter(|path| is_local_path(path)),
    };
    let mut ctx = HttpInitContext {
        state: &state,
        provider: flow.key(),
        return_to,
        redirect: None,
    };

    flow.init(&mut ctx)?;
    ctx.redirect
        .map(|url| Redirect::to(&url))
        .ok_or_else(|| AppError::internal("Login did not produce a redirect"))
}

/// Provider redirect target
///
/// GET /oauth2/:provider/callback?code=xxx[&state=xxx]
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Redirect> {
    let flow = state.flow(&provider)?;
    if let Some(error) = params.get("error") {
        debug!(provider = flow.key(), error = %error, "Provider returned an error");
        return Err(AppError::unauthorized(format!(
            "{} login was not completed: {error}",
            flow.name()
        )));
    }

    let mut ctx = HttpCallbackContext {
        state: &state,
        provider: flow.key(),
        allow_sign_up: flow.allows_users_to_sign_up(),
        params,
        return_to: None,
        redirect: None,
    };

    match flow.callback(&mut ctx).await? {
        CallbackOutcome::Authenticated(identity) => {
            info!(provider = flow.key(), login = %identity.login, "Login completed");
        }
        CallbackOutcome::Unauthorized { provider_login, .. } => {
            info!(provider = flow.key(), %provider_login, "Login refused by domain restriction");
        }
    }

    ctx.redirect
        .map(|url| Redirect::to(&url))
        .ok_or_else(|| AppError::internal("Login did not produce a redirect"))
}

/// GET /sessions/unauthorized
pub async fn unauthorized() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Html("<h1>Unauthorized</h1><p>Your account is not allowed to log in to this server.</p>"),
    )
}

/// Relative path on this server, not a protocol-relative URL
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

struct HttpInitContext<'a> {
    state: &'a AppState,
    provider: &'static str,
    return_to: Option<String>,
    redirect: Option<String>,
}

impl InitContext for HttpInitContext<'_> {
    fn callback_url(&self) -> String {
        self.state.callback_url(self.provider)
    }

    fn generate_csrf_state(&mut self) -> Option<String> {
        Some(
            self.state
                .login_states
                .issue(self.provider, self.return_to.take()),
        )
    }

    fn redirect_to(&mut self, url: &str) -> Result<()> {
        self.redirect = Some(url.to_string());
        Ok(())
    }
}

struct HttpCallbackContext<'a> {
    state: &'a AppState,
    provider: &'static str,
    allow_sign_up: bool,
    params: HashMap<String, String>,
    return_to: Option<String>,
    redirect: Option<String>,
}

impl CallbackContext for HttpCallbackContext<'_> {
    fn callback_url(&self) -> String {
        self.state.callback_url(self.provider)
    }

    fn request_parameter(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }

    fn verify_csrf_state(&mut self) -> Result<()> {
        let token = self
            .params
            .get("state")
            .ok_or_else(|| Error::Authentication("Missing OAuth2 state".to_string()))?;
        let pending = self.state.login_states.take(token, self.provider)?;
        self.return_to = pending.return_to;
        Ok(())
    }

    fn authenticate(&mut self, identity: &NormalizedIdentity) -> Result<()> {
        self.state.users.sign_in(identity, self.allow_sign_up)?;
        Ok(())
    }

    fn redirect_to(&mut self, url: &str) -> Result<()> {
        self.redirect = Some(url.to_string());
        Ok(())
    }

    fn redirect_to_requested_page(&mut self) -> Result<()> {
        let page = self.return_to.take().unwrap_or_else(|| "/".to_string());
        self.redirect = Some(page);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_local_path() {
        assert!(is_local_path("/projects?id=1"));
        assert!(!is_local_path("//evil.com"));
        assert!(!is_local_path("https://evil.com"));
        assert!(!is_local_path("/\\evil.com"));
    }
}
