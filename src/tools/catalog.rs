use serde_json::{Value, json};

/// One entry of `tools/list`.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema of the arguments object.
    pub input_schema: Value,
}

fn tab_id_property(description: &str) -> Value {
    json!({ "tab_id": { "type": "string", "description": description } })
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    if required.is_empty() {
        json!({ "type": "object", "properties": properties })
    } else {
        json!({ "type": "object", "properties": properties, "required": required })
    }
}

/// The static tool catalog, in presentation order.
#[must_use]
pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "open_url",
            description: "Open a URL in the browser",
            input_schema: object_schema(
                json!({
                    "url": { "type": "string", "description": "URL to open" },
                    "new_tab": {
                        "type": "boolean",
                        "description": "Open in a new tab",
                        "default": true
                    }
                }),
                &["url"],
            ),
        },
        ToolDefinition {
            name: "get_current_tab",
            description: "Get information about the current active tab",
            input_schema: object_schema(json!({}), &[]),
        },
        ToolDefinition {
            name: "list_tabs",
            description: "List all open tabs in the browser",
            input_schema: object_schema(
                json!({
                    "window_id": {
                        "type": "number",
                        "description": "Specific window ID to list tabs from"
                    }
                }),
                &[],
            ),
        },
        ToolDefinition {
            name: "close_tab",
            description: "Close a specific tab",
            input_schema: object_schema(tab_id_property("ID of the tab to close"), &["tab_id"]),
        },
        ToolDefinition {
            name: "switch_to_tab",
            description: "Switch to a specific tab",
            input_schema: object_schema(
                tab_id_property("ID of the tab to switch to"),
                &["tab_id"],
            ),
        },
        ToolDefinition {
            name: "reload_tab",
            description: "Reload a tab",
            input_schema: object_schema(tab_id_property("ID of the tab to reload"), &[]),
        },
        ToolDefinition {
            name: "go_back",
            description: "Navigate back in browser history",
            input_schema: object_schema(tab_id_property("ID of the tab"), &[]),
        },
        ToolDefinition {
            name: "go_forward",
            description: "Navigate forward in browser history",
            input_schema: object_schema(tab_id_property("ID of the tab"), &[]),
        },
        ToolDefinition {
            name: "execute_javascript",
            description: "Execute JavaScript in the current tab",
            input_schema: object_schema(
                json!({
                    "code": { "type": "string", "description": "JavaScript code to execute" },
                    "tab_id": { "type": "string", "description": "ID of the tab" }
                }),
                &["code"],
            ),
        },
        ToolDefinition {
            name: "get_page_content",
            description: "Get the text content of the current page",
            input_schema: object_schema(tab_id_property("ID of the tab"), &[]),
        },
        ToolDefinition {
            name: "get_browser_version",
            description: "Get the browser name, protocol version and user agent",
            input_schema: object_schema(json!({}), &[]),
        },
    ]
}
