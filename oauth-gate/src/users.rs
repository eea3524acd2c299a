//! In-memory user registry fed by successful logins

use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use oauth_gate_core::oauth2::NormalizedIdentity;
use oauth_gate_core::{Error, Result};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub login: String,
    pub name: String,
    pub email: Option<String>,
    pub provider: String,
    pub provider_login: String,
    pub provider_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

impl User {
    fn from_identity(identity: &NormalizedIdentity, now: DateTime<Utc>) -> Self {
        Self {
            login: identity.login.clone(),
            name: identity.display_name.clone(),
            email: identity.email.clone(),
            provider: identity.provider.clone(),
            provider_login: identity.provider_login.clone(),
            provider_id: identity.provider_id.clone(),
            created_at: now,
            last_login_at: now,
        }
    }
}

#[derive(Debug, Default)]
pub struct UserRegistry {
    users: DashMap<String, User>,
}

impl UserRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or refresh the user behind `identity`
    ///
    /// Unknown logins are refused when `allow_sign_up` is false.
    pub fn sign_in(&self, identity: &NormalizedIdentity, allow_sign_up: bool) -> Result<User> {
        let now = Utc::now();
        match self.users.entry(identity.login.clone()) {
            Entry::Occupied(mut entry) => {
                let user = entry.get_mut();
                user.name.clone_from(&identity.display_name);
                user.email.clone_from(&identity.email);
                user.last_login_at = now;
                Ok(user.clone())
            }
            Entry::Vacant(_) if !allow_sign_up => Err(Error::Host(format!(
                "'{}' is not a known user and {} sign-up is disabled",
                identity.login, identity.provider
            ))),
            Entry::Vacant(entry) => {
                info!(login = %identity.login, provider = %identity.provider, "New user registered");
                Ok(entry.insert(User::from_identity(identity, now)).clone())
            }
        }
    }

    #[must_use]
    pub fn get(&self, login: &str) -> Option<User> {
        self.users.get(login).map(|user| user.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
