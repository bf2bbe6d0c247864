use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::command::{AuthContext, CommandRequest, Origin};
use crate::config::RelayConfig;
use crate::core::Core;
use crate::error::{CoreError, CoreResult};
use crate::relay::protocol::{RelayRequest, RelayResponse};
use crate::relay::sessions::SessionStore;

/// Accepts relay connections and forwards authenticated command text into
/// the router. Connections are independent; the only state they share is the
/// session store and the router's own synchronization.
pub struct RelayServer {
    listener: TcpListener,
    context: ConnectionContext,
}

#[derive(Clone)]
struct ConnectionContext {
    core: Arc<Core>,
    sessions: Arc<SessionStore>,
    secret: String,
    timeout: Duration,
}

impl RelayServer {
    pub async fn bind(config: &RelayConfig, secret: &str, core: Arc<Core>) -> CoreResult<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|error| {
                CoreError::Supervision(format!(
                    "relay failed to bind {}:{}: {error}",
                    config.host, config.port
                ))
            })?;
        Ok(Self {
            listener,
            context: ConnectionContext {
                core,
                sessions: Arc::new(SessionStore::new(config.session_ttl_seconds)),
                secret: secret.to_string(),
                timeout: Duration::from_secs(config.connection_timeout_seconds.max(1)),
            },
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        self.context.sessions.clone()
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "relay connection accepted");
                        let context = self.context.clone();
                        let conn_shutdown = shutdown.clone();
                        connections.spawn(handle_connection(stream, peer, context, conn_shutdown));
                    }
                    Err(error) => {
                        tracing::warn!(%error, "relay accept failed");
                    }
                }
            }
        }
        drop(self.listener);
        connections.shutdown().await;
        tracing::info!("relay server stopped");
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    context: ConnectionContext,
    mut shutdown: watch::Receiver<bool>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.changed() => break,
            read = tokio::time::timeout(context.timeout, lines.next_line()) => match read {
                Err(_) => {
                    tracing::debug!(%peer, "relay connection timed out");
                    break;
                }
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => break,
                Ok(Err(error)) => {
                    tracing::debug!(%peer, %error, "relay read failed");
                    break;
                }
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let (response, close) = context.handle_line(&line, &peer).await;
        let mut payload = match serde_json::to_string(&response) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::error!(%error, "relay response serialization failed");
                break;
            }
        };
        payload.push('\n');
        if write_half.write_all(payload.as_bytes()).await.is_err() {
            break;
        }
        if close {
            break;
        }
    }
    tracing::debug!(%peer, "relay connection closed");
}

impl ConnectionContext {
    /// One exchange: authenticate, then forward exactly one command payload.
    /// A failed authentication never reaches the router.
    async fn handle_line(&self, line: &str, peer: &SocketAddr) -> (RelayResponse, bool) {
        let request: RelayRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(error) => {
                tracing::debug!(%peer, %error, "malformed relay request");
                return (RelayResponse::auth_error("malformed request"), true);
            }
        };

        let session_token = if !self.secret.is_empty() && request.token == self.secret {
            Some(self.sessions.issue(&peer.ip().to_string()).token)
        } else if self.sessions.validate(&request.token).is_some() {
            None
        } else {
            tracing::warn!(%peer, "relay authentication failed");
            return (
                RelayResponse::auth_error("invalid or expired token"),
                true,
            );
        };

        if request.text.trim().eq_ignore_ascii_case("logout") {
            self.sessions.revoke(&request.token);
            return (
                RelayResponse {
                    status: crate::relay::protocol::RelayStatus::Ok,
                    reply_text: "Session closed.".to_string(),
                    session_token: None,
                },
                true,
            );
        }

        let command = CommandRequest::new(&request.text, Origin::Relay).with_auth(AuthContext {
            client_id: peer.ip().to_string(),
            token: request.token.clone(),
        });
        let result = self.core.submit_request(command).await;
        (RelayResponse::from_result(&result, session_token), false)
    }
}
