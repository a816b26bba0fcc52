use serde::Serialize;
use thiserror::Error;

use super::error::CdpError;

/// Category of a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Nothing is listening at the debugging endpoint.
    BrowserUnreachable,
    /// The browser or the transport reported an error.
    Protocol,
    /// The addressed target does not exist.
    TargetNotFound,
    /// No response arrived within the command timeout.
    Timeout,
    /// No page-type target exists to act on.
    NoActiveTarget,
    /// The tool arguments could not be decoded.
    InvalidArguments,
}

/// A user-facing failure: a kind plus a message ready to show.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn no_active_target() -> Self {
        Self::new(FailureKind::NoActiveTarget, "No active tab found")
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidArguments, message)
    }

    #[must_use]
    pub fn is_target_not_found(&self) -> bool {
        self.kind == FailureKind::TargetNotFound
    }
}

/// What to tell the user when the browser cannot be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remediation {
    /// Display name of the browser.
    pub browser_name: String,
    /// Path of the browser binary, when known for this platform.
    pub executable: Option<String>,
    /// Port the server expects the browser to debug on.
    pub port: u16,
}

impl Remediation {
    /// The full multi-line remediation message.
    #[must_use]
    pub fn message(&self) -> String {
        let name = &self.browser_name;
        let flag = format!("--remote-debugging-port={}", self.port);
        let launch = match &self.executable {
            Some(path) => format!("2. Launch {name} with: {path} {flag}"),
            None => format!("2. Launch {name} with the {flag} flag"),
        };
        format!(
            "{name} is not running with remote debugging enabled.\n\n\
             To enable remote debugging:\n\
             1. Close {name} completely\n\
             {launch}\n\
             3. Or add {flag} to your {name} startup flags\n\n\
             Note: Remote debugging must be enabled for browser control to work."
        )
    }
}

/// Rewrite a low-level executor error into a user-facing failure.
#[must_use]
pub fn classify(err: &CdpError, remediation: &Remediation) -> Failure {
    match err {
        CdpError::Unreachable { .. } => {
            Failure::new(FailureKind::BrowserUnreachable, remediation.message())
        }
        CdpError::CommandTimeout { .. } => Failure::new(FailureKind::Timeout, err.to_string()),
        _ if err.status() == Some(404) => {
            Failure::new(FailureKind::TargetNotFound, format!("CDP error: {err}"))
        }
        _ => Failure::new(FailureKind::Protocol, format!("CDP error: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remediation() -> Remediation {
        Remediation {
            browser_name: "Dia Browser".into(),
            executable: Some("/Applications/Dia.app/Contents/MacOS/Dia".into()),
            port: 9222,
        }
    }

    #[test]
    fn unreachable_carries_remediation_steps() {
        let err = CdpError::Unreachable {
            endpoint: "127.0.0.1:9222".into(),
            detail: "Connection refused".into(),
        };
        let failure = classify(&err, &remediation());
        assert_eq!(failure.kind, FailureKind::BrowserUnreachable);
        assert!(failure.message.starts_with("Dia Browser is not running"));
        assert!(
            failure
                .message
                .contains("/Applications/Dia.app/Contents/MacOS/Dia --remote-debugging-port=9222")
        );
        assert!(failure.message.contains("1. Close Dia Browser completely"));
    }

    #[test]
    fn remediation_without_executable() {
        let r = Remediation {
            browser_name: "Chromium".into(),
            executable: None,
            port: 9333,
        };
        let msg = r.message();
        assert!(msg.contains("2. Launch Chromium with the --remote-debugging-port=9333 flag"));
    }

    #[test]
    fn protocol_error_is_prefixed() {
        let err = CdpError::Protocol {
            code: Some(-32000),
            message: "Cannot navigate to invalid URL".into(),
        };
        let failure = classify(&err, &remediation());
        assert_eq!(failure.kind, FailureKind::Protocol);
        assert_eq!(failure.message, "CDP error: Cannot navigate to invalid URL");
    }

    #[test]
    fn not_found_statuses_map_to_target_not_found() {
        let http = CdpError::HttpStatus {
            status: 404,
            reason: "Not Found".into(),
        };
        assert!(classify(&http, &remediation()).is_target_not_found());
        let ws = CdpError::HandshakeRejected { status: 404 };
        assert!(classify(&ws, &remediation()).is_target_not_found());
    }

    #[test]
    fn other_statuses_are_protocol_errors() {
        let err = CdpError::HttpStatus {
            status: 500,
            reason: "Internal Server Error".into(),
        };
        let failure = classify(&err, &remediation());
        assert_eq!(failure.kind, FailureKind::Protocol);
        assert_eq!(failure.message, "CDP error: HTTP 500: Internal Server Error");
    }

    #[test]
    fn timeout_message() {
        let err = CdpError::CommandTimeout {
            method: "Page.reload".into(),
        };
        let failure = classify(&err, &remediation());
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.message, "WebSocket command timeout");
    }

    #[test]
    fn malformed_payload_is_protocol() {
        let err = CdpError::InvalidResponse("Failed to parse WebSocket response: x".into());
        assert_eq!(classify(&err, &remediation()).kind, FailureKind::Protocol);
    }
}
