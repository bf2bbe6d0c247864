//! HTTP front door: liveness, remote trigger, and dispatch audit.

pub mod error;
pub mod openapi;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use utoipa::ToSchema;

use crate::capability::FailureKind;
use crate::command::Origin;
use crate::config::ApiConfig;
use crate::core::Core;
use crate::error::{CoreError, CoreResult};
use crate::routing::AuditEntry;
use crate::server::error::{ApiError, ApiErrorResponse};
use crate::supervisor::SupervisorState;
use crate::utils::time::now_secs;

pub struct ApiServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

pub(crate) struct ServerState {
    pub(crate) core: Arc<Core>,
    pub(crate) secret: String,
    pub(crate) supervisor_state: watch::Receiver<SupervisorState>,
    pub(crate) started_at: u64,
}

impl ApiServer {
    pub async fn bind(
        config: &ApiConfig,
        secret: &str,
        core: Arc<Core>,
        supervisor_state: watch::Receiver<SupervisorState>,
    ) -> CoreResult<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|error| {
                CoreError::Supervision(format!(
                    "http front door failed to bind {}:{}: {error}",
                    config.host, config.port
                ))
            })?;
        Ok(Self {
            listener,
            state: Arc::new(ServerState {
                core,
                secret: secret.to_string(),
                supervisor_state,
                started_at: now_secs(),
            }),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        let app = Router::new()
            .route("/health", get(health))
            .route("/trigger", post(trigger))
            .route("/audit", get(audit))
            .with_state(self.state.clone())
            .layer(cors);

        let served = axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await;
        if let Err(error) = served {
            tracing::error!(%error, "http front door failed");
        }
        tracing::info!("http front door stopped");
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: SupervisorState,
    pub uptime_seconds: u64,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TriggerRequest {
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TriggerResponse {
    pub ok: bool,
    pub reply_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditResponse {
    pub entries: Vec<AuditEntry>,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, body = HealthResponse),
    )
)]
pub(crate) async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: *state.supervisor_state.borrow(),
        uptime_seconds: now_secs().saturating_sub(state.started_at),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/trigger",
    tag = "commands",
    request_body = TriggerRequest,
    responses(
        (status = 200, body = TriggerResponse),
        (status = 400, body = ApiErrorResponse),
        (status = 401, body = ApiErrorResponse),
    )
)]
pub(crate) async fn trigger(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(request): Json<TriggerRequest>,
) -> Result<Json<TriggerResponse>, ApiError> {
    authorize(&headers, &state.secret)?;
    if request.command.trim().is_empty() {
        return Err(ApiError::bad_request("command must not be empty"));
    }

    let result = state.core.submit(&request.command, Origin::Api).await;
    Ok(Json(TriggerResponse {
        ok: result.success,
        reply_text: result.reply_text,
        error_kind: result.error_kind,
    }))
}

#[utoipa::path(
    get,
    path = "/audit",
    tag = "system",
    responses(
        (status = 200, body = AuditResponse),
        (status = 401, body = ApiErrorResponse),
    )
)]
pub(crate) async fn audit(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Result<Json<AuditResponse>, ApiError> {
    authorize(&headers, &state.secret)?;
    Ok(Json(AuditResponse {
        entries: state.core.audit_snapshot(),
    }))
}

/// Bearer-token check shared by the authenticated routes. The router trusts
/// any request that passes here.
fn authorize(headers: &HeaderMap, secret: &str) -> Result<(), ApiError> {
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match provided {
        Some(token) if !secret.is_empty() && token == secret => Ok(()),
        _ => Err(ApiError::unauthorized("missing or invalid bearer token")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        boxed_reply_future, CapabilityRegistry, CapabilityResult, FnCapability,
    };
    use crate::routing::{DispatchAudit, RouterOptions};

    fn test_core() -> Arc<Core> {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(FnCapability::new(
            "ping",
            ["ping"],
            Arc::new(|_, _| boxed_reply_future(async { Ok(CapabilityResult::ok("pong")) })),
        )));
        Arc::new(
            Core::new(
                registry,
                Arc::new(DispatchAudit::new()),
                RouterOptions::default(),
            )
            .expect("valid core"),
        )
    }

    async fn start_server() -> (SocketAddr, watch::Sender<bool>) {
        // the receiver keeps reporting the last value even once the sender
        // is gone, which is all the health endpoint needs here
        let (_state_tx, state_rx) = watch::channel(SupervisorState::Running);
        let config = ApiConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let server = ApiServer::bind(&config, "front-door-secret", test_core(), state_rx)
            .await
            .expect("bind");
        let addr = server.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(server.run(shutdown_rx));
        (addr, shutdown_tx)
    }

    #[tokio::test]
    async fn health_is_open_and_reports_state() {
        let (addr, _shutdown) = start_server().await;

        let response = reqwest::get(format!("http://{addr}/health"))
            .await
            .expect("request");
        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("json");
        assert_eq!(body["status"], "running");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn trigger_requires_bearer_token() {
        let (addr, _shutdown) = start_server().await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{addr}/trigger"))
            .json(&serde_json::json!({ "command": "ping" }))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), 401);
    }

    #[tokio::test]
    async fn trigger_routes_through_the_core() {
        let (addr, _shutdown) = start_server().await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{addr}/trigger"))
            .bearer_auth("front-door-secret")
            .json(&serde_json::json!({ "command": "ping" }))
            .send()
            .await
            .expect("request");
        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("json");
        assert_eq!(body["ok"], true);
        assert_eq!(body["reply_text"], "pong");
    }

    #[tokio::test]
    async fn audit_lists_dispatches() {
        let (addr, _shutdown) = start_server().await;

        let client = reqwest::Client::new();
        client
            .post(format!("http://{addr}/trigger"))
            .bearer_auth("front-door-secret")
            .json(&serde_json::json!({ "command": "ping" }))
            .send()
            .await
            .expect("trigger");

        let response = client
            .get(format!("http://{addr}/audit"))
            .bearer_auth("front-door-secret")
            .send()
            .await
            .expect("request");
        let body: serde_json::Value = response.json().await.expect("json");
        let entries = body["entries"].as_array().expect("entries");
        assert!(entries.iter().any(|e| e["capability"] == "ping"));
    }

    #[tokio::test]
    async fn empty_command_is_a_bad_request() {
        let (addr, _shutdown) = start_server().await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{addr}/trigger"))
            .bearer_auth("front-door-secret")
            .json(&serde_json::json!({ "command": "  " }))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), 400);
    }
}
