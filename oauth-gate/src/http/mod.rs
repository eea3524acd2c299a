// Module: http
// Reference host for the OAuth2 login flows

pub mod error;
pub mod health;
pub mod oauth2;

use std::sync::Arc;

use axum::Router;
use oauth_gate_core::oauth2::{descriptor, AuthFlowController, HttpTransport};
use oauth_gate_core::Settings;
use tower_http::trace::TraceLayer;

use crate::login_state::LoginStateStore;
use crate::users::UserRegistry;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub flows: Arc<Vec<AuthFlowController>>,
    pub login_states: Arc<LoginStateStore>,
    pub users: Arc<UserRegistry>,
    /// Public URL of this server, without trailing slash
    pub base_url: String,
}

impl AppState {
    /// One flow controller per supported provider, all sharing `settings` and `transport`
    pub fn new(
        settings: Arc<dyn Settings>,
        transport: Arc<dyn HttpTransport>,
        base_url: &str,
    ) -> Self {
        let flows = descriptor::all()
            .into_iter()
            .map(|descriptor| {
                AuthFlowController::new(descriptor, settings.clone(), transport.clone())
            })
            .collect();

        Self {
            flows: Arc::new(flows),
            login_states: Arc::new(LoginStateStore::default()),
            users: Arc::new(UserRegistry::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn flow(&self, provider: &str) -> AppResult<&AuthFlowController> {
        self.flows
            .iter()
            .find(|flow| flow.key() == provider)
            .ok_or_else(|| AppError::not_found(format!("Unknown provider: {provider}")))
    }

    #[must_use]
    pub fn callback_url(&self, provider: &str) -> String {
        format!("{}/oauth2/{provider}/callback", self.base_url)
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::create_health_router())
        .merge(oauth2::create_oauth2_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header::LOCATION, Request, Response, StatusCode};
    use http_body_util::BodyExt;
    use oauth_gate_core::oauth2::settings::{
        ALLOW_USERS_TO_SIGN_UP, API_URL, CLIENT_ID, CLIENT_SECRET, ENABLED, WEB_URL,
    };
    use oauth_gate_core::oauth2::{ProviderDescriptor, ReqwestTransport, BITBUCKET, GOOGLE};
    use oauth_gate_core::{bootstrap, AppConfig, MemorySettings};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_state() -> (Arc<MemorySettings>, AppState) {
        let settings = Arc::new(bootstrap::seed_settings(&AppConfig::default()));
        let transport = Arc::new(ReqwestTransport::new().unwrap());
        let state = AppState::new(settings.clone(), transport, "http://localhost:9000/");
        (settings, state)
    }

    fn enable(settings: &MemorySettings, descriptor: &ProviderDescriptor, server: Option<&MockServer>) {
        settings.set(descriptor.settings_key(CLIENT_ID), "the_id");
        settings.set(descriptor.settings_key(CLIENT_SECRET), "the_secret");
        settings.set_bool(descriptor.settings_key(ENABLED), true);
        if let Some(server) = server {
            settings.set(descriptor.settings_key(API_URL), server.uri());
            settings.set(descriptor.settings_key(WEB_URL), server.uri());
        }
    }

    async fn get(state: &AppState, uri: &str) -> Response<Body> {
        create_router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &Response<Body>) -> String {
        response.headers()[LOCATION].to_str().unwrap().to_string()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn mount_bitbucket(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/site/oauth2/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2.0/user"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"username": "john", "display_name": "John Smith"})),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2.0/user/emails"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_health() {
        let (_, state) = test_state();
        let response = get(&state, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_lists_enabled_providers_only() {
        let (settings, state) = test_state();
        enable(&settings, &BITBUCKET, None);

        let body = json_body(get(&state, "/api/providers").await).await;
        assert_eq!(
            body,
            json!([{
                "key": "bitbucket",
                "name": "Bitbucket",
                "display": {
                    "icon_path": "/static/authbitbucket/bitbucket.svg",
                    "background_color": "#205081"
                },
                "allows_users_to_sign_up": true,
                "init_url": "/oauth2/bitbucket/init"
            }])
        );
    }

    #[tokio::test]
    async fn test_init_redirects_with_state() {
        let (settings, state) = test_state();
        enable(&settings, &GOOGLE, None);

        let response = get(&state, "/oauth2/google/init").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with(
            "https://accounts.google.com/o/oauth2/v2/auth?response_type=code&client_id=the_id\
             &redirect_uri=http%3A%2F%2Flocalhost%3A9000%2Foauth2%2Fgoogle%2Fcallback\
             &scope=openid%20email&state="
        ));
        assert_eq!(state.login_states.len(), 1);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let (_, state) = test_state();

        let response = get(&state, "/oauth2/google/init").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            json_body(response).await["error"],
            "Google authentication is disabled"
        );

        let response = get(&state, "/oauth2/github/init").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_callback_without_state_is_unauthorized() {
        let (settings, state) = test_state();
        enable(&settings, &GOOGLE, None);

        let response = get(&state, "/oauth2/google/callback?code=the-code").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_google_round_trip_returns_to_requested_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/v3/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oauth2/v1/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "42",
                "email": "john.smith@googleoauth.com",
                "name": "John Smith"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (settings, state) = test_state();
        enable(&settings, &GOOGLE, Some(&server));

        let response = get(&state, "/oauth2/google/init?return_to=/projects").await;
        let redirect = location(&response);
        let token = redirect.split("&state=").nth(1).unwrap();

        let response = get(
            &state,
            &format!("/oauth2/google/callback?code=the-code&state={token}"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/projects");
        assert!(state.users.get("john.smith@googleoauth.com@google").is_some());
        assert!(state.login_states.is_empty());
    }

    #[tokio::test]
    async fn test_bitbucket_callback_registers_user() {
        let server = MockServer::start().await;
        mount_bitbucket(&server).await;
        let (settings, state) = test_state();
        enable(&settings, &BITBUCKET, Some(&server));

        let response = get(&state, "/oauth2/bitbucket/callback?code=the-code").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let user = state.users.get("john@bitbucket").unwrap();
        assert_eq!(user.name, "John Smith");
        assert!(user.email.is_none());
    }

    #[tokio::test]
    async fn test_return_to_is_ignored_without_state() {
        let server = MockServer::start().await;
        mount_bitbucket(&server).await;
        let (settings, state) = test_state();
        enable(&settings, &BITBUCKET, Some(&server));

        let response = get(&state, "/oauth2/bitbucket/init?return_to=/projects").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(!location(&response).contains("state="));
        assert!(state.login_states.is_empty());

        let response = get(&state, "/oauth2/bitbucket/callback?code=the-code").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_sign_up_disabled_rejects_new_user() {
        let server = MockServer::start().await;
        mount_bitbucket(&server).await;
        let (settings, state) = test_state();
        enable(&settings, &BITBUCKET, Some(&server));
        settings.set_bool(BITBUCKET.settings_key(ALLOW_USERS_TO_SIGN_UP), false);

        let response = get(&state, "/oauth2/bitbucket/callback?code=the-code").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.users.is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_parameter() {
        let (settings, state) = test_state();
        enable(&settings, &BITBUCKET, None);

        let response = get(&state, "/oauth2/bitbucket/callback?error=access_denied").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
