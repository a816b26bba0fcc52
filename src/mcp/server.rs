use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, InitializeRequestParam,
    InitializeResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler};
use serde_json::Value;

use crate::dispatch::Dispatcher;
use crate::tools::{ToolDefinition, ToolResult, call_tool, catalog};

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "dia-browser-control";

const INSTRUCTIONS: &str = "Controls a Chromium-based browser over its remote debugging \
port. Tools that take an optional tab_id act on the first open page when it is omitted; \
use list_tabs to find ids.";

/// MCP server exposing the browser tools.
///
/// JSON-RPC framing, the handshake and request routing are handled by
/// `rmcp`; this type supplies the catalog and runs tool calls.
#[derive(Debug)]
pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_owned(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.to_owned()),
        }
    }

    /// Answers with the protocol revision the client asked for.
    async fn initialize(
        &self,
        request: InitializeRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        tracing::info!(
            client = %request.client_info.name,
            protocol = %request.protocol_version,
            "client connected"
        );
        let protocol_version = request.protocol_version.clone();
        if context.peer.peer_info().is_none() {
            context.peer.set_peer_info(request);
        }
        Ok(InitializeResult {
            protocol_version,
            ..self.get_info()
        })
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = catalog().into_iter().map(tool_from_definition).collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = request.arguments.map_or(Value::Null, Value::Object);
        let result = call_tool(&self.dispatcher, &request.name, arguments).await;
        Ok(result.into())
    }
}

fn tool_from_definition(definition: ToolDefinition) -> Tool {
    let schema = match definition.input_schema {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    Tool::new(definition.name, definition.description, Arc::new(schema))
}

impl From<ToolResult> for CallToolResult {
    fn from(result: ToolResult) -> Self {
        let content = vec![Content::text(result.text)];
        if result.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        }
    }
}
