use std::time::Duration;

use serde_json::Value;

use super::error::CdpError;
use super::http::{HttpExecutor, HttpVerb};
use super::transport::SocketExecutor;

/// Default host of the browser's remote debugging endpoint.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default remote debugging port.
pub const DEFAULT_PORT: u16 = 9222;

/// Default bound on a single WebSocket command, in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 10_000;

/// Where the browser's debugging endpoint lives and how long to wait on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdpConfig {
    pub host: String,
    pub port: u16,
    /// Bound on one WebSocket command, connect through response.
    pub command_timeout: Duration,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
        }
    }
}

impl CdpConfig {
    /// `host:port`, as shown in diagnostics.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL of the HTTP discovery surface.
    #[must_use]
    pub fn http_base(&self) -> String {
        format!("http://{}", self.endpoint())
    }

    /// Base URL of the per-target WebSocket surface.
    #[must_use]
    pub fn ws_base(&self) -> String {
        format!("ws://{}", self.endpoint())
    }
}

/// Resolve `host:port` before dialing.
///
/// A failed lookup means no browser can be reached at the configured
/// address, which the executors report as `Unreachable` on both transports.
pub(crate) async fn resolve_endpoint(endpoint: &str) -> Result<(), CdpError> {
    match tokio::net::lookup_host(endpoint)
        .await
        .map(|mut addrs| addrs.next().is_some())
    {
        Ok(true) => Ok(()),
        Ok(_) => Err(CdpError::Unreachable {
            endpoint: endpoint.to_owned(),
            detail: "host resolved to no addresses".to_owned(),
        }),
        Err(e) => Err(CdpError::Unreachable {
            endpoint: endpoint.to_owned(),
            detail: format!("host not found: {e}"),
        }),
    }
}

/// The channel a command travels over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport<'a> {
    /// Browser-level operation against the HTTP surface.
    Http,
    /// Target-scoped command over that target's WebSocket.
    WebSocket { target_id: &'a str },
}

/// Choose the transport for a command.
///
/// A target id selects the WebSocket; no target id (or an empty one)
/// selects HTTP.
#[must_use]
pub fn select_transport(target_id: Option<&str>) -> Transport<'_> {
    match target_id {
        Some(id) if !id.is_empty() => Transport::WebSocket { target_id: id },
        _ => Transport::Http,
    }
}

/// Routes commands to the HTTP or WebSocket executor.
#[derive(Debug)]
pub struct CdpExecutor {
    config: CdpConfig,
    http: HttpExecutor,
    socket: SocketExecutor,
}

impl CdpExecutor {
    /// # Errors
    ///
    /// Returns `CdpError::InvalidEndpoint` if the host does not form a URL.
    pub fn new(config: CdpConfig) -> Result<Self, CdpError> {
        let http = HttpExecutor::new(&config)?;
        let socket = SocketExecutor::new(&config);
        Ok(Self {
            config,
            http,
            socket,
        })
    }

    #[must_use]
    pub fn config(&self) -> &CdpConfig {
        &self.config
    }

    #[must_use]
    pub fn http(&self) -> &HttpExecutor {
        &self.http
    }

    #[must_use]
    pub fn socket(&self) -> &SocketExecutor {
        &self.socket
    }

    /// Execute `method` over the transport implied by `target_id`.
    ///
    /// Over HTTP, `method` is the request path and the entries of a
    /// `params` object become query parameters.
    ///
    /// # Errors
    ///
    /// Propagates the selected executor's error unchanged.
    pub async fn execute(
        &self,
        method: &str,
        params: Value,
        target_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        match select_transport(target_id) {
            Transport::WebSocket { target_id } => {
                self.socket.execute(method, params, target_id).await
            }
            Transport::Http => {
                let query = query_pairs(&params);
                let body = self.http.execute(HttpVerb::Get, method, &query).await?;
                Ok(body.into_value())
            }
        }
    }
}

fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let Some(map) = params.as_object() else {
        return Vec::new();
    };
    map.iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}
