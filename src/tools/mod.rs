mod catalog;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::cdp::{Failure, FailureKind};
use crate::dispatch::{Direction, Dispatcher, Evaluation, HistoryMove, Opened};

pub use catalog::{ToolDefinition, catalog};

/// Text shown when an operation addresses a tab that does not exist.
pub const TAB_NOT_FOUND: &str = "Tab not found";

// =============================================================================
// Results
// =============================================================================

/// Rendered outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub text: String,
    /// Set for failures the caller should treat as errors.
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    #[must_use]
    pub fn error(failure: &Failure) -> Self {
        Self {
            text: format!("Error: {}", failure.message),
            is_error: true,
        }
    }
}

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug, Deserialize)]
struct OpenUrlArgs {
    url: String,
    #[serde(default = "default_new_tab")]
    new_tab: bool,
}

fn default_new_tab() -> bool {
    true
}

/// `window_id` is accepted for compatibility and ignored; CDP has no
/// window grouping of targets. Only its type is checked.
#[derive(Debug, Deserialize)]
struct ListTabsArgs {
    #[serde(default, rename = "window_id")]
    _window_id: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RequiredTabArgs {
    tab_id: String,
}

#[derive(Debug, Deserialize)]
struct OptionalTabArgs {
    #[serde(default)]
    tab_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExecuteJavascriptArgs {
    code: String,
    #[serde(default)]
    tab_id: Option<String>,
}

fn decode<T: DeserializeOwned>(arguments: Value) -> Result<T, Failure> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| Failure::invalid_arguments(format!("Invalid arguments: {e}")))
}

/// A decoded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    OpenUrl { url: String, new_tab: bool },
    GetCurrentTab,
    ListTabs,
    CloseTab { tab_id: String },
    SwitchToTab { tab_id: String },
    ReloadTab { tab_id: Option<String> },
    Navigate { tab_id: Option<String>, direction: Direction },
    ExecuteJavascript { code: String, tab_id: Option<String> },
    GetPageContent { tab_id: Option<String> },
    GetBrowserVersion,
}

impl ToolCall {
    /// Decode `arguments` for the tool called `name`.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArguments` failure for an unknown tool or
    /// arguments that do not match the tool's schema.
    pub fn parse(name: &str, arguments: Value) -> Result<Self, Failure> {
        let call = match name {
            "open_url" => {
                let args: OpenUrlArgs = decode(arguments)?;
                Self::OpenUrl {
                    url: args.url,
                    new_tab: args.new_tab,
                }
            }
            "get_current_tab" => Self::GetCurrentTab,
            "list_tabs" => {
                let _: ListTabsArgs = decode(arguments)?;
                Self::ListTabs
            }
            "close_tab" => Self::CloseTab {
                tab_id: decode::<RequiredTabArgs>(arguments)?.tab_id,
            },
            "switch_to_tab" => Self::SwitchToTab {
                tab_id: decode::<RequiredTabArgs>(arguments)?.tab_id,
            },
            "reload_tab" => Self::ReloadTab {
                tab_id: decode::<OptionalTabArgs>(arguments)?.tab_id,
            },
            "go_back" => Self::Navigate {
                tab_id: decode::<OptionalTabArgs>(arguments)?.tab_id,
                direction: Direction::Back,
            },
            "go_forward" => Self::Navigate {
                tab_id: decode::<OptionalTabArgs>(arguments)?.tab_id,
                direction: Direction::Forward,
            },
            "execute_javascript" => {
                let args: ExecuteJavascriptArgs = decode(arguments)?;
                Self::ExecuteJavascript {
                    code: args.code,
                    tab_id: args.tab_id,
                }
            }
            "get_page_content" => Self::GetPageContent {
                tab_id: decode::<OptionalTabArgs>(arguments)?.tab_id,
            },
            "get_browser_version" => Self::GetBrowserVersion,
            other => return Err(Failure::invalid_arguments(format!("Unknown tool: {other}"))),
        };
        Ok(call)
    }

    /// Whether a missing tab is reported as `Tab not found` rather than an error.
    #[must_use]
    pub fn tolerates_missing_tab(&self) -> bool {
        !matches!(
            self,
            Self::OpenUrl { .. } | Self::GetCurrentTab | Self::ListTabs | Self::GetBrowserVersion
        )
    }

    async fn run(self, dispatcher: &Dispatcher) -> Result<String, Failure> {
        match self {
            Self::OpenUrl { url, new_tab } => match dispatcher.open_url(&url, new_tab).await? {
                Opened::NewTab => Ok(format!("Opened {url} in new tab")),
                Opened::Navigated { .. } => Ok(format!("Navigated to {url}")),
            },
            Self::GetCurrentTab => {
                let tab = dispatcher.active_target().await?;
                pretty(&CurrentTab {
                    url: &tab.url,
                    title: &tab.title,
                    id: &tab.id,
                })
            }
            Self::ListTabs => {
                let tabs = dispatcher.page_targets().await?;
                let summaries: Vec<TabSummary<'_>> = tabs
                    .iter()
                    .map(|t| TabSummary {
                        id: &t.id,
                        url: &t.url,
                        title: &t.title,
                    })
                    .collect();
                pretty(&summaries)
            }
            Self::CloseTab { tab_id } => {
                dispatcher.close_target(&tab_id).await?;
                Ok("Tab closed".into())
            }
            Self::SwitchToTab { tab_id } => {
                dispatcher.activate_target(&tab_id).await?;
                Ok("Switched to tab".into())
            }
            Self::ReloadTab { tab_id } => {
                dispatcher.reload(tab_id.as_deref()).await?;
                Ok("Tab reloaded".into())
            }
            Self::Navigate { tab_id, direction } => {
                let moved = dispatcher
                    .navigate_history(tab_id.as_deref(), direction)
                    .await?;
                Ok(history_text(direction, &moved).into())
            }
            Self::ExecuteJavascript { code, tab_id } => {
                match dispatcher.evaluate(&code, tab_id.as_deref()).await? {
                    Evaluation::Value(Some(value)) => Ok(render_value(&value)),
                    Evaluation::Value(None) => Ok("JavaScript executed".into()),
                    Evaluation::Exception(text) => Ok(format!("JavaScript error: {text}")),
                }
            }
            Self::GetPageContent { tab_id } => {
                match dispatcher.page_content(tab_id.as_deref()).await? {
                    Evaluation::Value(Some(Value::String(text))) if !text.is_empty() => Ok(text),
                    Evaluation::Value(None | Some(Value::Null | Value::String(_))) => {
                        Ok("No content found".into())
                    }
                    Evaluation::Value(Some(other)) => Ok(render_value(&other)),
                    Evaluation::Exception(text) => {
                        Ok(format!("Error getting page content: {text}"))
                    }
                }
            }
            Self::GetBrowserVersion => pretty(&dispatcher.browser_version().await?),
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

#[derive(Serialize)]
struct CurrentTab<'a> {
    url: &'a str,
    title: &'a str,
    id: &'a str,
}

#[derive(Serialize)]
struct TabSummary<'a> {
    id: &'a str,
    url: &'a str,
    title: &'a str,
}

fn pretty<T: Serialize>(value: &T) -> Result<String, Failure> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Failure::new(FailureKind::Protocol, format!("failed to render result: {e}")))
}

fn history_text(direction: Direction, moved: &HistoryMove) -> &'static str {
    match (direction, moved) {
        (Direction::Back, HistoryMove::Moved { .. }) => "Navigated back",
        (Direction::Back, HistoryMove::AtBoundary) => "Cannot go back - at beginning of history",
        (Direction::Forward, HistoryMove::Moved { .. }) => "Navigated forward",
        (Direction::Forward, HistoryMove::AtBoundary) => "Cannot go forward - at end of history",
    }
}

/// Strings verbatim, everything else as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Run one tool invocation end to end.
///
/// Never fails: every failure becomes a result, flagged as an error unless
/// it is a benign missing tab.
pub async fn call_tool(dispatcher: &Dispatcher, name: &str, arguments: Value) -> ToolResult {
    let call = match ToolCall::parse(name, arguments) {
        Ok(call) => call,
        Err(failure) => {
            tracing::warn!(tool = name, error = %failure, "rejected tool call");
            return ToolResult::error(&failure);
        }
    };
    tracing::debug!(tool = name, ?call, "tool call");

    let tolerates_missing_tab = call.tolerates_missing_tab();
    match call.run(dispatcher).await {
        Ok(text) => ToolResult::ok(text),
        Err(failure) if tolerates_missing_tab && failure.is_target_not_found() => {
            ToolResult::ok(TAB_NOT_FOUND)
        }
        Err(failure) => ToolResult::error(&failure),
    }
}
