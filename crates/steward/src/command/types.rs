use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::time::now_secs;

/// The channel a command arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Voice,
    Relay,
    Api,
    Scheduled,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Origin::Voice => "voice",
            Origin::Relay => "relay",
            Origin::Api => "api",
            Origin::Scheduled => "scheduled",
        };
        f.write_str(label)
    }
}

/// Credentials attached to a remotely submitted command.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub client_id: String,
    pub token: String,
}

/// A single command as received from any channel. Immutable; consumed exactly
/// once by the router and discarded after dispatch.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub text: String,
    pub origin: Origin,
    pub received_at: u64,
    pub auth: Option<AuthContext>,
}

impl CommandRequest {
    pub fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            text: text.into(),
            origin,
            received_at: now_secs(),
            auth: None,
        }
    }

    pub fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = Some(auth);
        self
    }

    /// A copy of this request carrying a sub-phrase, used when a compound
    /// phrase is split into sequential commands.
    pub fn sub_request(&self, text: &str) -> Self {
        Self {
            text: text.to_string(),
            origin: self.origin,
            received_at: self.received_at,
            auth: self.auth.clone(),
        }
    }
}
