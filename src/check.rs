//! Connectivity check for the `check` subcommand.

use std::fmt::Write as _;

use serde::Serialize;

use crate::cdp::{BrowserVersion, Failure, Target};
use crate::dispatch::Dispatcher;

/// What the debugging endpoint reported.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub endpoint: String,
    pub browser: String,
    pub protocol_version: String,
    pub user_agent: String,
    pub ws_debugger_url: String,
    pub target_count: usize,
    pub pages: Vec<Target>,
}

impl CheckReport {
    #[must_use]
    pub fn new(endpoint: String, version: BrowserVersion, targets: Vec<Target>) -> Self {
        let target_count = targets.len();
        let pages = targets.into_iter().filter(Target::is_page).collect();
        Self {
            endpoint,
            browser: version.browser,
            protocol_version: version.protocol_version,
            user_agent: version.user_agent,
            ws_debugger_url: version.ws_debugger_url,
            target_count,
            pages,
        }
    }
}

/// Query `/json/version` then `/json/list`.
///
/// # Errors
///
/// Returns the classified failure of whichever request fails first.
pub async fn run_check(dispatcher: &Dispatcher) -> Result<CheckReport, Failure> {
    let endpoint = dispatcher.executor().config().http_base();
    let version = dispatcher.browser_version().await?;
    let targets = dispatcher.list_targets().await?;
    Ok(CheckReport::new(endpoint, version, targets))
}

/// Human-readable rendering of a report.
#[must_use]
pub fn format_report(report: &CheckReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Debugging endpoint: {}", report.endpoint);
    let _ = writeln!(out, "Browser: {}", report.browser);
    let _ = writeln!(out, "Protocol: {}", report.protocol_version);
    let _ = writeln!(out, "User-Agent: {}", report.user_agent);
    let _ = writeln!(out, "WebSocket URL: {}", report.ws_debugger_url);
    let _ = writeln!(
        out,
        "Targets: {} total, {} page tabs",
        report.target_count,
        report.pages.len()
    );
    for (index, page) in report.pages.iter().enumerate() {
        let _ = writeln!(out, "  {}. {} - {}", index + 1, page.title, page.url);
        let _ = writeln!(out, "     ID: {}", page.id);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: &str, kind: &str, title: &str) -> Target {
        Target {
            id: id.into(),
            target_type: kind.into(),
            title: title.into(),
            url: format!("https://{id}.test/"),
            ws_debugger_url: None,
        }
    }

    fn report() -> CheckReport {
        let version = BrowserVersion {
            browser: "Chrome/126.0.0.0".into(),
            protocol_version: "1.3".into(),
            user_agent: "Mozilla/5.0".into(),
            ws_debugger_url: "ws://127.0.0.1:9222/devtools/browser/b".into(),
            ..BrowserVersion::default()
        };
        CheckReport::new(
            "http://127.0.0.1:9222".into(),
            version,
            vec![
                target("a", "page", "Alpha"),
                target("sw", "service_worker", ""),
                target("b", "page", "Beta"),
            ],
        )
    }

    #[test]
    fn counts_all_targets_but_lists_pages() {
        let report = report();
        assert_eq!(report.target_count, 3);
        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.pages[1].id, "b");
    }

    #[test]
    fn format_lists_pages_in_order() {
        let text = format_report(&report());
        assert!(text.contains("Browser: Chrome/126.0.0.0"));
        assert!(text.contains("Targets: 3 total, 2 page tabs"));
        assert!(text.contains("  1. Alpha - https://a.test/"));
        assert!(text.contains("  2. Beta - https://b.test/"));
        assert!(text.contains("     ID: b"));
    }

    #[test]
    fn report_serializes() {
        let value = serde_json::to_value(report()).unwrap();
        assert_eq!(value["target_count"], 3);
        assert_eq!(value["pages"][0]["type"], "page");
    }
}
