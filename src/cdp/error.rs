use std::io::ErrorKind;

use thiserror::Error;

/// Errors raised by the HTTP and WebSocket command executors.
///
/// Variants carry structured fields (status codes, protocol error codes)
/// so the classifier never has to inspect message text.
#[derive(Debug, Error)]
pub enum CdpError {
    /// The debugging endpoint refused the connection or could not be resolved.
    #[error("browser unreachable at {endpoint}: {detail}")]
    Unreachable {
        /// `host:port` that was dialed.
        endpoint: String,
        /// Low-level error text.
        detail: String,
    },

    /// The HTTP surface answered with a non-success status.
    #[error("HTTP {status}: {reason}")]
    HttpStatus {
        /// Numeric HTTP status code.
        status: u16,
        /// Reason phrase for the status.
        reason: String,
    },

    /// The per-target WebSocket upgrade was refused with an HTTP status.
    #[error("WebSocket handshake rejected: HTTP {status}")]
    HandshakeRejected {
        /// Status returned instead of `101 Switching Protocols`.
        status: u16,
    },

    /// The browser answered the command with an error object.
    #[error("{message}")]
    Protocol {
        /// The CDP error code, when the browser supplied one.
        code: Option<i64>,
        /// The CDP error message.
        message: String,
    },

    /// No matching response arrived within the command timeout.
    #[error("WebSocket command timeout")]
    CommandTimeout {
        /// The CDP method that timed out.
        method: String,
    },

    /// The socket closed before the matching response arrived.
    #[error("WebSocket connection closed before a response arrived")]
    ConnectionClosed,

    /// Transport-level WebSocket failure.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// An inbound payload could not be decoded.
    #[error("{0}")]
    InvalidResponse(String),

    /// Transport-level HTTP failure other than an unreachable host.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The configured host/port does not form a valid URL.
    #[error("invalid debugging endpoint: {0}")]
    InvalidEndpoint(String),

    /// Internal error (e.g. a blocking task panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

impl CdpError {
    /// The HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } | Self::HandshakeRejected { status } => Some(*status),
            _ => None,
        }
    }
}

/// Whether an I/O error kind means nothing is listening at the endpoint.
#[must_use]
pub fn is_unreachable_kind(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionRefused
            | ErrorKind::AddrNotAvailable
            | ErrorKind::HostUnreachable
            | ErrorKind::NetworkUnreachable
    )
}

impl From<CdpError> for crate::error::AppError {
    fn from(e: CdpError) -> Self {
        use crate::error::ExitCode;
        let code = match &e {
            CdpError::Unreachable { .. }
            | CdpError::ConnectionClosed
            | CdpError::WebSocket(_)
            | CdpError::Http(_) => ExitCode::ConnectionError,
            CdpError::CommandTimeout { .. } => ExitCode::TimeoutError,
            CdpError::HttpStatus { .. }
            | CdpError::HandshakeRejected { .. }
            | CdpError::Protocol { .. } => ExitCode::ProtocolError,
            CdpError::InvalidResponse(_)
            | CdpError::InvalidEndpoint(_)
            | CdpError::Internal(_) => ExitCode::GeneralError,
        };
        Self {
            message: e.to_string(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unreachable() {
        let err = CdpError::Unreachable {
            endpoint: "127.0.0.1:9222".into(),
            detail: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "browser unreachable at 127.0.0.1:9222: connection refused"
        );
    }

    #[test]
    fn display_http_status() {
        let err = CdpError::HttpStatus {
            status: 404,
            reason: "Not Found".into(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
    }

    #[test]
    fn display_protocol_passes_message_through() {
        let err = CdpError::Protocol {
            code: Some(-32000),
            message: "Cannot navigate to invalid URL".into(),
        };
        assert_eq!(err.to_string(), "Cannot navigate to invalid URL");
    }

    #[test]
    fn display_command_timeout() {
        let err = CdpError::CommandTimeout {
            method: "Page.reload".into(),
        };
        assert_eq!(err.to_string(), "WebSocket command timeout");
    }

    #[test]
    fn status_is_exposed_for_http_and_handshake() {
        let http = CdpError::HttpStatus {
            status: 500,
            reason: "Internal Server Error".into(),
        };
        assert_eq!(http.status(), Some(500));
        assert_eq!(CdpError::HandshakeRejected { status: 404 }.status(), Some(404));
        assert_eq!(CdpError::ConnectionClosed.status(), None);
    }

    #[test]
    fn refused_and_unreachable_kinds() {
        assert!(is_unreachable_kind(ErrorKind::ConnectionRefused));
        assert!(is_unreachable_kind(ErrorKind::AddrNotAvailable));
        assert!(!is_unreachable_kind(ErrorKind::TimedOut));
        assert!(!is_unreachable_kind(ErrorKind::InvalidData));
    }

    #[test]
    fn app_error_exit_codes() {
        use crate::error::{AppError, ExitCode};

        let unreachable: AppError = CdpError::Unreachable {
            endpoint: "x".into(),
            detail: "y".into(),
        }
        .into();
        assert!(matches!(unreachable.code, ExitCode::ConnectionError));

        let timeout: AppError = CdpError::CommandTimeout {
            method: "Page.reload".into(),
        }
        .into();
        assert!(matches!(timeout.code, ExitCode::TimeoutError));

        let protocol: AppError = CdpError::Protocol {
            code: None,
            message: "nope".into(),
        }
        .into();
        assert!(matches!(protocol.code, ExitCode::ProtocolError));
    }
}
