use std::fmt;

use serde::Serialize;

use crate::cdp::{Failure, FailureKind};
use crate::config::ConfigError;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    ConnectionError = 2,
    TargetError = 3,
    TimeoutError = 4,
    ProtocolError = 5,
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::GeneralError => write!(f, "general error"),
            Self::ConnectionError => write!(f, "connection error"),
            Self::TargetError => write!(f, "target error"),
            Self::TimeoutError => write!(f, "timeout error"),
            Self::ProtocolError => write!(f, "protocol error"),
        }
    }
}

/// Process-level error: a message and the exit code it maps to.
#[derive(Debug)]
pub struct AppError {
    pub message: String,
    pub code: ExitCode,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: ExitCode::GeneralError,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        let output = ErrorOutput {
            error: &self.message,
            code: self.code as u8,
        };
        serde_json::to_string(&output).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"{}","code":{}}}"#,
                self.message, self.code as u8
            )
        })
    }

    pub fn print_json_stderr(&self) {
        eprintln!("{}", self.to_json());
    }
}

#[derive(Serialize)]
struct ErrorOutput<'a> {
    error: &'a str,
    code: u8,
}

impl From<Failure> for AppError {
    fn from(f: Failure) -> Self {
        let code = match f.kind {
            FailureKind::BrowserUnreachable => ExitCode::ConnectionError,
            FailureKind::TargetNotFound | FailureKind::NoActiveTarget => ExitCode::TargetError,
            FailureKind::Timeout => ExitCode::TimeoutError,
            FailureKind::Protocol => ExitCode::ProtocolError,
            FailureKind::InvalidArguments => ExitCode::GeneralError,
        };
        Self {
            message: f.message,
            code,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::general(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        Self::general(format!("I/O error: {e}"))
    }
}
