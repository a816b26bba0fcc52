use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::{Duration, Instant};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::client::{CdpConfig, resolve_endpoint};
use super::error::{CdpError, is_unreachable_kind};
use super::types::{CdpCommand, CdpResponse, correlation_id};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on the closing handshake so teardown never outlives the call.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Executor for target-scoped commands over a short-lived WebSocket.
///
/// Each call opens its own connection to the target, sends exactly one
/// command, waits for the response carrying the same correlation id, and
/// closes the connection. No reconnection, no queuing.
#[derive(Debug)]
pub struct SocketExecutor {
    ws_base: String,
    endpoint: String,
    command_timeout: Duration,
    next_id: AtomicU64,
}

impl SocketExecutor {
    #[must_use]
    pub fn new(config: &CdpConfig) -> Self {
        Self {
            ws_base: config.ws_base(),
            endpoint: config.endpoint(),
            command_timeout: config.command_timeout,
            next_id: AtomicU64::new(1),
        }
    }

    /// WebSocket URL of a target's debugging socket.
    #[must_use]
    pub fn target_url(&self, target_id: &str) -> String {
        format!(
            "{}/devtools/page/{}",
            self.ws_base,
            urlencoding::encode(target_id)
        )
    }

    /// Generate the next correlation id.
    pub fn next_message_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send one command to `target_id` and wait for its response.
    ///
    /// The timeout bounds the whole exchange (connect, send, wait). Once
    /// connected, the socket is closed exactly once whatever the outcome.
    ///
    /// # Errors
    ///
    /// - `CdpError::Unreachable` if the host does not resolve or refuses the connection
    /// - `CdpError::HandshakeRejected` if the upgrade is refused (unknown target)
    /// - `CdpError::Protocol` if the browser answers with an error object
    /// - `CdpError::InvalidResponse` on an undecodable inbound payload
    /// - `CdpError::CommandTimeout` if no matching response arrives in time
    pub async fn execute(
        &self,
        method: &str,
        params: Value,
        target_id: &str,
    ) -> Result<Value, CdpError> {
        let url = self.target_url(target_id);
        let command = CdpCommand {
            id: self.next_message_id(),
            method: method.to_owned(),
            params,
        };
        let deadline = Instant::now() + self.command_timeout;

        let connect = async {
            resolve_endpoint(&self.endpoint).await?;
            let (stream, _response) = tokio_tungstenite::connect_async(&url)
                .await
                .map_err(|e| connect_error(&self.endpoint, e))?;
            Ok::<_, CdpError>(stream)
        };
        let mut ws = match tokio::time::timeout_at(deadline, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(CdpError::CommandTimeout {
                    method: command.method,
                });
            }
        };
        tracing::debug!(id = command.id, method, target_id, "CDP command");

        let outcome = match tokio::time::timeout_at(deadline, exchange(&mut ws, &command)).await {
            Ok(result) => result,
            Err(_) => Err(CdpError::CommandTimeout {
                method: command.method.clone(),
            }),
        };

        close(&mut ws).await;
        tracing::debug!(id = command.id, ok = outcome.is_ok(), "CDP command settled");
        outcome
    }
}

/// Send the command and read until the matching response arrives.
async fn exchange(ws: &mut WsStream, command: &CdpCommand) -> Result<Value, CdpError> {
    let json = serde_json::to_string(command)
        .map_err(|e| CdpError::Internal(format!("serialization error: {e}")))?;
    ws.send(Message::Text(json.into()))
        .await
        .map_err(|e| CdpError::WebSocket(format!("write error: {e}")))?;

    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if let Some(reply) = correlate(&text, command.id) {
                    return reply;
                }
            }
            Ok(Message::Close(_)) => return Err(CdpError::ConnectionClosed),
            Ok(_) => {
                // Binary, Ping, Pong, Frame
            }
            Err(e) => return Err(CdpError::WebSocket(e.to_string())),
        }
    }
    Err(CdpError::ConnectionClosed)
}

/// Match one inbound text frame against the outstanding correlation id.
///
/// Returns `None` for frames that belong to something else (events,
/// stray or oddly shaped responses). A payload that is not valid JSON is
/// terminal.
fn correlate(text: &str, expected_id: u64) -> Option<Result<Value, CdpError>> {
    let frame: Value = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            return Some(Err(CdpError::InvalidResponse(format!(
                "Failed to parse WebSocket response: {e}"
            ))));
        }
    };
    if correlation_id(&frame) != Some(expected_id) {
        tracing::trace!(
            id = ?frame.get("id"),
            method = ?frame.get("method"),
            "ignoring unrelated message"
        );
        return None;
    }
    let response: CdpResponse = match serde_json::from_value(frame) {
        Ok(response) => response,
        Err(e) => {
            return Some(Err(CdpError::InvalidResponse(format!(
                "Unexpected WebSocket response shape: {e}"
            ))));
        }
    };
    Some(response.into_reply().map_err(|e| CdpError::Protocol {
        code: e.code,
        message: e.message,
    }))
}

async fn close(ws: &mut WsStream) {
    match tokio::time::timeout(CLOSE_GRACE, ws.close(None)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "WebSocket close reported an error"),
        Err(_) => tracing::debug!("WebSocket close timed out"),
    }
}

fn connect_error(endpoint: &str, err: tungstenite::Error) -> CdpError {
    match err {
        tungstenite::Error::Io(io) if is_unreachable_kind(io.kind()) => CdpError::Unreachable {
            endpoint: endpoint.to_owned(),
            detail: io.to_string(),
        },
        tungstenite::Error::Http(response) => CdpError::HandshakeRejected {
            status: response.status().as_u16(),
        },
        other => CdpError::WebSocket(other.to_string()),
    }
}
