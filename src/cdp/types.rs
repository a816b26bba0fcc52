use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing CDP command envelope: `{id, method, params}`.
#[derive(Debug, Serialize)]
pub struct CdpCommand {
    /// Correlation id, unique within the connection that carries it.
    pub id: u64,
    /// CDP method name (e.g., `Page.navigate`).
    pub method: String,
    /// Parameter object; `{}` when the method takes none.
    pub params: Value,
}

/// Correlation id of an inbound frame.
///
/// Events carry no `id`; a frame whose `id` is not an unsigned integer
/// cannot answer any command this client sent.
#[must_use]
pub fn correlation_id(frame: &Value) -> Option<u64> {
    frame.get("id").and_then(Value::as_u64)
}

/// The response frame matching an outstanding command.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<CdpProtocolError>,
}

/// CDP protocol error payload returned by the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpProtocolError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

impl CdpResponse {
    /// Split a response into its result payload or protocol error.
    ///
    /// A response without a `result` field resolves to `null`.
    pub fn into_reply(self) -> Result<Value, CdpProtocolError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A debuggable target as listed by `/json/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Opaque target identifier, stable for the target's lifetime.
    pub id: String,

    /// Target type (`page`, `service_worker`, `background_page`, ...).
    #[serde(rename = "type")]
    pub target_type: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub url: String,

    /// WebSocket URL to debug this specific target.
    #[serde(
        rename = "webSocketDebuggerUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ws_debugger_url: Option<String>,
}

impl Target {
    /// Type string that marks a real, user-visible page.
    pub const PAGE_TYPE: &'static str = "page";

    #[must_use]
    pub fn is_page(&self) -> bool {
        self.target_type == Self::PAGE_TYPE
    }
}

/// Browser build information returned by `/json/version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,

    #[serde(rename = "Protocol-Version")]
    pub protocol_version: String,

    #[serde(rename = "User-Agent")]
    pub user_agent: String,

    #[serde(rename = "V8-Version", skip_serializing_if = "String::is_empty")]
    pub v8_version: String,

    #[serde(rename = "WebKit-Version", skip_serializing_if = "String::is_empty")]
    pub webkit_version: String,

    /// The browser-level WebSocket debugger URL.
    #[serde(rename = "webSocketDebuggerUrl")]
    pub ws_debugger_url: String,
}

/// Result of `Page.getNavigationHistory`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationHistory {
    pub current_index: usize,
    pub entries: Vec<HistoryEntry>,
}

/// A single session-history entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
}
