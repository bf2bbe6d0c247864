use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityResult, FailureKind};

/// One relay exchange: `{ "token": ..., "text": ... }` in,
/// `{ "status": ..., "replyText": ... }` out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
    pub token: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelayStatus {
    Ok,
    AuthError,
    Unrecognized,
    ExecutorError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub status: RelayStatus,
    pub reply_text: String,
    /// Set when a shared-secret login minted a session; the client presents
    /// this instead of the secret until it expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl RelayResponse {
    pub fn from_result(result: &CapabilityResult, session_token: Option<String>) -> Self {
        let status = match result.error_kind {
            None => RelayStatus::Ok,
            Some(FailureKind::Unrecognized) => RelayStatus::Unrecognized,
            Some(FailureKind::ExecutorFailure) => RelayStatus::ExecutorError,
        };
        Self {
            status,
            reply_text: result.reply_text.clone(),
            session_token,
        }
    }

    pub fn auth_error(reply_text: impl Into<String>) -> Self {
        Self {
            status: RelayStatus::AuthError,
            reply_text: reply_text.into(),
            session_token: None,
        }
    }
}
