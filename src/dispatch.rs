//! Command dispatcher: resolves the active target, routes each operation
//! to the right executor, and classifies failures.

use serde_json::{Value, json};

use crate::cdp::{
    BrowserVersion, CdpError, CdpExecutor, Failure, HistoryEntry, NavigationHistory, Remediation,
    Target, classify,
};

/// Extracts the visible text of `document.body`, keeping each link's
/// target inline as `text [href]`.
const PAGE_CONTENT_SCRIPT: &str = r"(() => {
  const walk = (root) => {
    let out = '';
    for (const node of root.childNodes) {
      if (node.nodeType === Node.TEXT_NODE) {
        out += node.textContent;
      } else if (node.nodeType === Node.ELEMENT_NODE) {
        if (node.tagName === 'A' && node.href) {
          const label = node.textContent.trim();
          if (label && node.href !== 'javascript:void(0)') {
            out += label + ' [' + node.href + ']';
          } else if (label) {
            out += label;
          }
        } else {
          out += walk(node);
        }
      }
    }
    return out;
  };
  return document.body ? walk(document.body) : '';
})()";

/// Result of `open_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opened {
    /// A new tab was created.
    NewTab,
    /// The active tab navigated to the URL.
    Navigated { target_id: String },
}

/// Direction of a history move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Back,
    Forward,
}

impl Direction {
    /// Index of the neighbouring entry, if it exists.
    #[must_use]
    pub fn adjacent(self, current: usize, len: usize) -> Option<usize> {
        match self {
            Self::Back => current.checked_sub(1),
            Self::Forward => current.checked_add(1).filter(|next| *next < len),
        }
    }
}

/// Result of a history move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryMove {
    /// Moved to the given entry.
    Moved { entry: HistoryEntry },
    /// Already at the first (back) or last (forward) entry.
    AtBoundary,
}

/// Result of evaluating an expression in the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Completed; `None` when the expression produced `undefined`.
    Value(Option<Value>),
    /// The page threw; carries the exception text.
    Exception(String),
}

/// Routes tool-level operations to the CDP executors.
#[derive(Debug)]
pub struct Dispatcher {
    executor: CdpExecutor,
    remediation: Remediation,
}

impl Dispatcher {
    #[must_use]
    pub fn new(executor: CdpExecutor, remediation: Remediation) -> Self {
        Self {
            executor,
            remediation,
        }
    }

    #[must_use]
    pub fn executor(&self) -> &CdpExecutor {
        &self.executor
    }

    #[must_use]
    pub fn remediation(&self) -> &Remediation {
        &self.remediation
    }

    fn fail(&self, err: &CdpError) -> Failure {
        let failure = classify(err, &self.remediation);
        tracing::warn!(kind = ?failure.kind, error = %err, "CDP operation failed");
        failure
    }

    /// Every target the browser reports, in browser order.
    ///
    /// # Errors
    ///
    /// Returns a classified failure if the listing cannot be fetched.
    pub async fn list_targets(&self) -> Result<Vec<Target>, Failure> {
        self.executor
            .http()
            .list_targets()
            .await
            .map_err(|e| self.fail(&e))
    }

    /// Page-type targets only, in browser order.
    ///
    /// # Errors
    ///
    /// Returns a classified failure if the listing cannot be fetched.
    pub async fn page_targets(&self) -> Result<Vec<Target>, Failure> {
        let mut targets = self.list_targets().await?;
        targets.retain(Target::is_page);
        Ok(targets)
    }

    /// The first page-type target.
    ///
    /// CDP exposes no focus ordering, so "first page in the listing" stands
    /// in for the active tab.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTarget` if the browser has no page open.
    pub async fn active_target(&self) -> Result<Target, Failure> {
        first_page(self.list_targets().await?).ok_or_else(Failure::no_active_target)
    }

    /// The explicit target id, or the active target's id.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTarget` when no id is given and no page is open.
    pub async fn resolve_target(&self, target_id: Option<&str>) -> Result<String, Failure> {
        match target_id {
            Some(id) if !id.is_empty() => Ok(id.to_owned()),
            _ => Ok(self.active_target().await?.id),
        }
    }

    async fn send(&self, target_id: &str, method: &str, params: Value) -> Result<Value, Failure> {
        self.executor
            .execute(method, params, Some(target_id))
            .await
            .map_err(|e| self.fail(&e))
    }

    /// Open `url` in a new tab, or navigate the active tab to it.
    ///
    /// # Errors
    ///
    /// Returns a classified failure from the underlying call.
    pub async fn open_url(&self, url: &str, new_tab: bool) -> Result<Opened, Failure> {
        if new_tab {
            self.executor
                .http()
                .new_target(url)
                .await
                .map_err(|e| self.fail(&e))?;
            return Ok(Opened::NewTab);
        }
        let target_id = self.active_target().await?.id;
        self.send(&target_id, "Page.navigate", json!({ "url": url }))
            .await?;
        Ok(Opened::Navigated { target_id })
    }

    /// # Errors
    ///
    /// Returns `TargetNotFound` for an unknown id.
    pub async fn close_target(&self, target_id: &str) -> Result<(), Failure> {
        self.executor
            .http()
            .close_target(target_id)
            .await
            .map(drop)
            .map_err(|e| self.fail(&e))
    }

    /// # Errors
    ///
    /// Returns `TargetNotFound` for an unknown id.
    pub async fn activate_target(&self, target_id: &str) -> Result<(), Failure> {
        self.executor
            .http()
            .activate_target(target_id)
            .await
            .map(drop)
            .map_err(|e| self.fail(&e))
    }

    /// # Errors
    ///
    /// Returns a classified failure from target resolution or the command.
    pub async fn reload(&self, target_id: Option<&str>) -> Result<(), Failure> {
        let target_id = self.resolve_target(target_id).await?;
        self.send(&target_id, "Page.reload", json!({})).await?;
        Ok(())
    }

    /// Step one entry back or forward in the target's session history.
    ///
    /// At either end of the history no navigation is sent.
    ///
    /// # Errors
    ///
    /// Returns a classified failure from target resolution or either command.
    pub async fn navigate_history(
        &self,
        target_id: Option<&str>,
        direction: Direction,
    ) -> Result<HistoryMove, Failure> {
        let target_id = self.resolve_target(target_id).await?;
        let raw = self
            .send(&target_id, "Page.getNavigationHistory", json!({}))
            .await?;
        let history: NavigationHistory = serde_json::from_value(raw).map_err(|e| {
            self.fail(&CdpError::InvalidResponse(format!(
                "unexpected navigation history: {e}"
            )))
        })?;

        let Some(index) = direction.adjacent(history.current_index, history.entries.len()) else {
            return Ok(HistoryMove::AtBoundary);
        };
        let Some(entry) = history.entries.into_iter().nth(index) else {
            return Ok(HistoryMove::AtBoundary);
        };
        self.send(
            &target_id,
            "Page.navigateToHistoryEntry",
            json!({ "entryId": entry.id }),
        )
        .await?;
        Ok(HistoryMove::Moved { entry })
    }

    /// Evaluate `expression` in the target, awaiting promises.
    ///
    /// # Errors
    ///
    /// Returns a classified failure if the command itself fails. An
    /// exception thrown by the page is an `Evaluation::Exception`.
    pub async fn evaluate(
        &self,
        expression: &str,
        target_id: Option<&str>,
    ) -> Result<Evaluation, Failure> {
        let target_id = self.resolve_target(target_id).await?;
        let result = self
            .send(
                &target_id,
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        Ok(evaluation_from(&result))
    }

    /// Visible text of the target's page with links inlined.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::evaluate`].
    pub async fn page_content(&self, target_id: Option<&str>) -> Result<Evaluation, Failure> {
        self.evaluate(PAGE_CONTENT_SCRIPT, target_id).await
    }

    /// # Errors
    ///
    /// Returns a classified failure if `/json/version` cannot be fetched.
    pub async fn browser_version(&self) -> Result<BrowserVersion, Failure> {
        self.executor
            .http()
            .version()
            .await
            .map_err(|e| self.fail(&e))
    }
}

/// First page-type target of a listing.
#[must_use]
pub fn first_page(targets: Vec<Target>) -> Option<Target> {
    targets.into_iter().find(Target::is_page)
}

fn evaluation_from(result: &Value) -> Evaluation {
    if let Some(details) = result.get("exceptionDetails") {
        return Evaluation::Exception(exception_text(details));
    }
    let value = result
        .get("result")
        .and_then(|r| r.get("value"))
        .cloned();
    Evaluation::Value(value)
}

/// `text` of the exception details, extended with the first line of the
/// thrown value's description when that adds anything.
fn exception_text(details: &Value) -> String {
    let text = details
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or("Uncaught");
    let description = details
        .get("exception")
        .and_then(|e| e.get("description"))
        .and_then(Value::as_str)
        .and_then(|d| d.lines().next())
        .filter(|line| !line.is_empty() && *line != text);
    match description {
        Some(line) => format!("{text} {line}"),
        None => text.to_owned(),
    }
}
