//! Pending login attempts, keyed by anti-forgery state token

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use oauth_gate_core::{Error, Result};
use tracing::debug;

/// Login started by `init`, awaiting the provider's callback
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub provider: String,
    /// Local page to land on once authenticated
    pub return_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Single-use state tokens with a bounded lifetime and count
#[derive(Debug)]
pub struct LoginStateStore {
    states: DashMap<String, PendingLogin>,
    ttl: Duration,
    max_pending: usize,
}

impl Default for LoginStateStore {
    fn default() -> Self {
        Self::new(Duration::minutes(10))
    }
}

impl LoginStateStore {
    pub const DEFAULT_MAX_PENDING: usize = 10_000;

    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, Self::DEFAULT_MAX_PENDING)
    }

    /// Past `max_pending` outstanding logins, the oldest one is dropped
    #[must_use]
    pub fn with_capacity(ttl: Duration, max_pending: usize) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
            max_pending: max_pending.max(1),
        }
    }

    /// Record a pending login and return its state token
    pub fn issue(&self, provider: &str, return_to: Option<String>) -> String {
        self.purge_expired();
        while self.states.len() >= self.max_pending {
            if !self.evict_oldest() {
                break;
            }
        }

        let token = nanoid::nanoid!(32);
        self.states.insert(
            token.clone(),
            PendingLogin {
                provider: provider.to_string(),
                return_to,
                created_at: Utc::now(),
            },
        );
        token
    }

    /// Consume `token`; it must have been issued for `provider` and not be expired
    pub fn take(&self, token: &str, provider: &str) -> Result<PendingLogin> {
        let invalid = || Error::Authentication("Invalid or expired OAuth2 state".to_string());

        let (_, pending) = self.states.remove(token).ok_or_else(invalid)?;
        if pending.provider != provider {
            debug!(expected = %pending.provider, got = provider, "State issued for another provider");
            return Err(invalid());
        }
        if self.is_expired(&pending) {
            return Err(invalid());
        }
        Ok(pending)
    }

    fn is_expired(&self, pending: &PendingLogin) -> bool {
        Utc::now() - pending.created_at > self.ttl
    }

    fn purge_expired(&self) {
        self.states.retain(|_, pending| !self.is_expired(pending));
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .states
            .iter()
            .min_by_key(|entry| entry.value().created_at)
            .map(|entry| entry.key().clone());

        match oldest {
            Some(token) => {
                debug!(
                    max_pending = self.max_pending,
                    "Too many pending logins, dropping the oldest"
                );
                self.states.remove(&token);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
