use std::time::Duration;

use moka::sync::Cache;
use uuid::Uuid;

use crate::utils::time::now_secs;

/// An authenticated, time-bounded permission to submit commands through the
/// offline channel.
#[derive(Debug, Clone)]
pub struct RelaySession {
    pub client_id: String,
    pub token: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

/// Live relay sessions, keyed by token. The cache's time-to-live enforces
/// expiry; `validate` double-checks the recorded deadline so a token can
/// never outlive its session even across clock-driven eviction lag.
pub struct SessionStore {
    cache: Cache<String, RelaySession>,
    ttl_seconds: u64,
}

impl SessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(1024)
            .time_to_live(Duration::from_secs(ttl_seconds.max(1)))
            .build();
        Self {
            cache,
            ttl_seconds: ttl_seconds.max(1),
        }
    }

    pub fn issue(&self, client_id: &str) -> RelaySession {
        let issued_at = now_secs();
        let session = RelaySession {
            client_id: client_id.to_string(),
            token: Uuid::new_v4().to_string(),
            issued_at,
            expires_at: issued_at + self.ttl_seconds,
        };
        self.cache.insert(session.token.clone(), session.clone());
        tracing::debug!(client_id = %session.client_id, "relay session issued");
        session
    }

    pub fn validate(&self, token: &str) -> Option<RelaySession> {
        let session = self.cache.get(token)?;
        if now_secs() >= session.expires_at {
            self.cache.invalidate(token);
            return None;
        }
        Some(session)
    }

    pub fn revoke(&self, token: &str) {
        self.cache.invalidate(token);
    }
}
