//! Model Context Protocol server over stdio, built on `rmcp`.

mod server;

pub use server::{McpServer, SERVER_NAME};
