mod classify;
mod client;
mod error;
mod http;
mod transport;
mod types;

pub use classify::{Failure, FailureKind, Remediation, classify};
pub use client::{
    CdpConfig, CdpExecutor, DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_PORT, Transport,
    select_transport,
};
pub use error::CdpError;
pub use http::{HttpBody, HttpExecutor, HttpVerb};
pub use transport::SocketExecutor;
pub use types::{
    BrowserVersion, CdpCommand, CdpResponse, HistoryEntry, NavigationHistory, Target,
    correlation_id,
};
