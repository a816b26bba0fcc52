use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::client::{CdpConfig, resolve_endpoint};
use super::error::{CdpError, is_unreachable_kind};
use super::types::{BrowserVersion, Target};

/// HTTP verb used against the discovery surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpVerb {
    #[default]
    Get,
    /// Required by current browsers for `/json/new`.
    Put,
}

/// Decoded HTTP response body.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    /// The response declared a JSON content type.
    Json(Value),
    /// Any other content type, returned verbatim.
    Text(String),
}

impl HttpBody {
    /// Collapse into a JSON value; text bodies become JSON strings.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }

    /// Deserialize a JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns `CdpError::InvalidResponse` if the body is not JSON or does
    /// not match `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, CdpError> {
        match self {
            Self::Json(value) => serde_json::from_value(value)
                .map_err(|e| CdpError::InvalidResponse(format!("unexpected JSON shape: {e}"))),
            Self::Text(text) => serde_json::from_str(&text)
                .map_err(|e| CdpError::InvalidResponse(format!("expected a JSON body: {e}"))),
        }
    }
}

/// One-shot executor for the browser's debugging HTTP endpoint.
///
/// No retries and no explicit timeout; every call is a fresh request.
#[derive(Clone)]
pub struct HttpExecutor {
    base: Url,
    endpoint: String,
    agent: ureq::Agent,
}

impl fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpExecutor {
    /// Build an executor for the configured `host:port`.
    ///
    /// # Errors
    ///
    /// Returns `CdpError::InvalidEndpoint` if the host does not form a URL.
    pub fn new(config: &CdpConfig) -> Result<Self, CdpError> {
        let base = Url::parse(&config.http_base())
            .map_err(|e| CdpError::InvalidEndpoint(format!("{}: {e}", config.http_base())))?;
        let agent_config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .proxy(None)
            .build();
        Ok(Self {
            base,
            endpoint: config.endpoint(),
            agent: ureq::Agent::new_with_config(agent_config),
        })
    }

    /// The base address every request is resolved against.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Build the request URL for `path` with `query` appended.
    ///
    /// # Errors
    ///
    /// Returns `CdpError::InvalidEndpoint` if `path` cannot be joined.
    pub fn endpoint_url(&self, path: &str, query: &[(String, String)]) -> Result<Url, CdpError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| CdpError::InvalidEndpoint(format!("{path}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Issue one request and decode the body.
    ///
    /// # Errors
    ///
    /// - `CdpError::Unreachable` if the host does not resolve or nothing listens there
    /// - `CdpError::HttpStatus` for any non-success status
    /// - `CdpError::InvalidResponse` if a JSON body fails to parse
    pub async fn execute(
        &self,
        verb: HttpVerb,
        path: &str,
        query: &[(String, String)],
    ) -> Result<HttpBody, CdpError> {
        let url = self.endpoint_url(path, query)?;
        resolve_endpoint(&self.endpoint).await?;
        let agent = self.agent.clone();
        tracing::debug!(%url, ?verb, "HTTP request");

        let body = tokio::task::spawn_blocking(move || send_blocking(&agent, verb, &url))
            .await
            .map_err(|e| CdpError::Internal(format!("HTTP task join failed: {e}")))??;
        Ok(body)
    }

    /// `GET /json/list`.
    ///
    /// # Errors
    ///
    /// Propagates transport errors; `InvalidResponse` on a malformed list.
    pub async fn list_targets(&self) -> Result<Vec<Target>, CdpError> {
        self.execute(HttpVerb::Get, "/json/list", &[])
            .await?
            .into_json()
    }

    /// `PUT /json/new?{url}` opens a new tab.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn new_target(&self, url: &str) -> Result<HttpBody, CdpError> {
        let path = format!("/json/new?{}", urlencoding::encode(url));
        self.execute(HttpVerb::Put, &path, &[]).await
    }

    /// `GET /json/close/{id}`.
    ///
    /// # Errors
    ///
    /// Returns `CdpError::HttpStatus` with 404 for an unknown target.
    pub async fn close_target(&self, target_id: &str) -> Result<HttpBody, CdpError> {
        let path = format!("/json/close/{}", urlencoding::encode(target_id));
        self.execute(HttpVerb::Get, &path, &[]).await
    }

    /// `GET /json/activate/{id}`.
    ///
    /// # Errors
    ///
    /// Returns `CdpError::HttpStatus` with 404 for an unknown target.
    pub async fn activate_target(&self, target_id: &str) -> Result<HttpBody, CdpError> {
        let path = format!("/json/activate/{}", urlencoding::encode(target_id));
        self.execute(HttpVerb::Get, &path, &[]).await
    }

    /// `GET /json/version`.
    ///
    /// # Errors
    ///
    /// Propagates transport errors; `InvalidResponse` on a malformed body.
    pub async fn version(&self) -> Result<BrowserVersion, CdpError> {
        self.execute(HttpVerb::Get, "/json/version", &[])
            .await?
            .into_json()
    }
}

fn send_blocking(agent: &ureq::Agent, verb: HttpVerb, url: &Url) -> Result<HttpBody, CdpError> {
    let result = match verb {
        HttpVerb::Get => agent.get(url.as_str()).call(),
        HttpVerb::Put => agent.put(url.as_str()).send_empty(),
    };
    let mut response = result.map_err(|e| transport_error(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status.as_u16()));
    }

    let is_json = response
        .headers()
        .get(ureq::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| CdpError::Http(format!("failed to read response body: {e}")))?;

    if is_json {
        serde_json::from_str(&text)
            .map(HttpBody::Json)
            .map_err(|e| CdpError::InvalidResponse(format!("Failed to parse HTTP response: {e}")))
    } else {
        Ok(HttpBody::Text(text))
    }
}

fn status_error(status: u16) -> CdpError {
    let reason = ureq::http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status");
    CdpError::HttpStatus {
        status,
        reason: reason.to_owned(),
    }
}

fn transport_error(url: &Url, err: &ureq::Error) -> CdpError {
    let endpoint = format!(
        "{}:{}",
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or_default()
    );
    match err {
        ureq::Error::StatusCode(status) => status_error(*status),
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => CdpError::Unreachable {
            endpoint,
            detail: err.to_string(),
        },
        ureq::Error::Io(io) if is_unreachable_kind(io.kind()) => CdpError::Unreachable {
            endpoint,
            detail: io.to_string(),
        },
        other => CdpError::Http(other.to_string()),
    }
}
