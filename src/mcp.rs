//! MCP Protocol Handler
//!
//! Implements JSON-RPC 2.0 over stdio for Model Context Protocol.
//! Reference: https://modelcontextprotocol.io/specification

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::tools::{status_definition, ResourceContent, ToolRegistry, RESOURCE_SCHEME};

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl McpResponse {
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }

    /// Notification (no id, no response expected)
    pub fn notification() -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: None,
            id: None,
        }
    }
}

/// Tool result carried as text content
pub fn tool_result(text: impl Into<String>, is_error: bool) -> serde_json::Value {
    json!({
        "content": [{
            "type": "text",
            "text": text.into()
        }],
        "isError": is_error
    })
}

/// MCP Error Codes
pub mod error_codes {
    // JSON-RPC standard errors
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // MCP custom errors (-32000 to -32099)
    pub const RESOURCE_NOT_FOUND: i32 = -32002;
}

/// Whether the tool layer came up
enum Backend {
    Ready(Arc<ToolRegistry>),
    /// Initialisation failed; only `status` is served
    Degraded(String),
}

/// MCP Server
pub struct McpServer {
    backend: Backend,
}

impl McpServer {
    /// Create new MCP server. A failed tool setup is logged and the
    /// server starts in degraded mode instead of exiting.
    pub fn new(config: Config) -> Self {
        match ToolRegistry::new(Arc::new(config)) {
            Ok(tools) => Self::with_registry(tools),
            Err(e) => {
                error!("Initialisation failed, serving status only: {:#}", e);
                Self::degraded(format!("{:#}", e))
            }
        }
    }

    pub fn with_registry(tools: ToolRegistry) -> Self {
        Self {
            backend: Backend::Ready(Arc::new(tools)),
        }
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            backend: Backend::Degraded(reason.into()),
        }
    }

    /// Run the MCP server (stdio mode)
    pub async fn run(&self) -> anyhow::Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        info!("MCP server ready, waiting for requests...");

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                info!("Client disconnected (EOF)");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!("← {}", trimmed);

            let response = match serde_json::from_str::<McpRequest>(trimmed) {
                Ok(request) => {
                    // Notifications carry no id and get no response
                    if request.id.is_none() && request.method.starts_with("notifications/") {
                        debug!("Received notification {}", request.method);
                        continue;
                    }
                    self.handle_request(request).await
                }
                Err(e) => {
                    error!("Parse error: {}", e);
                    McpResponse::error(None, error_codes::PARSE_ERROR, format!("Parse error: {}", e))
                }
            };

            // Don't send response for notifications
            if response.id.is_none() && response.result.is_none() && response.error.is_none() {
                continue;
            }

            let response_json = serde_json::to_string(&response)?;
            debug!("→ {}", response_json);

            stdout.write_all(response_json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }

        Ok(())
    }

    /// Handle a single MCP request
    pub async fn handle_request(&self, request: McpRequest) -> McpResponse {
        match request.method.as_str() {
            // Lifecycle
            "initialize" => self.handle_initialize(request.id),
            "initialized" => McpResponse::notification(),
            "shutdown" => {
                info!("Shutdown requested");
                McpResponse::success(request.id, json!({}))
            }

            // Tools
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,

            // Resources
            "resources/list" => McpResponse::success(request.id, json!({ "resources": [] })),
            "resources/templates/list" => self.handle_resource_templates(request.id),
            "resources/read" => self.handle_resources_read(request.id, request.params).await,

            // Ping
            "ping" => McpResponse::success(request.id, json!({})),

            // Unknown
            method => {
                warn!("Unknown method: {}", method);
                McpResponse::error(
                    request.id,
                    error_codes::METHOD_NOT_FOUND,
                    format!("Method not found: {}", method),
                )
            }
        }
    }

    /// Handle initialize
    fn handle_initialize(&self, id: Option<serde_json::Value>) -> McpResponse {
        McpResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {
                        "listChanged": false
                    },
                    "resources": {
                        "listChanged": false,
                        "subscribe": false
                    }
                },
                "serverInfo": {
                    "name": "drive-forge",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    /// Handle tools/list
    fn handle_tools_list(&self, id: Option<serde_json::Value>) -> McpResponse {
        let tools = match &self.backend {
            Backend::Ready(tools) => tools.list_definitions(),
            Backend::Degraded(_) => vec![status_definition()],
        };
        McpResponse::success(id, json!({ "tools": tools }))
    }

    /// Handle tools/call. Tool failures are results with `isError`, so the
    /// agent can read them; only malformed calls are protocol errors.
    async fn handle_tools_call(
        &self,
        id: Option<serde_json::Value>,
        params: serde_json::Value,
    ) -> McpResponse {
        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(n) => n,
            None => {
                return McpResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    "Missing 'name' parameter",
                )
            }
        };

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        let tools = match &self.backend {
            Backend::Ready(tools) => tools,
            Backend::Degraded(reason) => {
                let result = if name == "status" {
                    tool_result(
                        json!({ "status": "degraded", "error": reason }).to_string(),
                        false,
                    )
                } else {
                    tool_result(
                        format!("Error: Server failed to initialise: {}", reason),
                        true,
                    )
                };
                return McpResponse::success(id, result);
            }
        };

        match tools.call(name, arguments).await {
            Ok(text) => McpResponse::success(id, tool_result(text, false)),
            Err(e) => {
                warn!("Tool '{}' failed: {:#}", name, e);
                McpResponse::success(
                    id,
                    tool_result(format!("Tool '{}' failed: {:#}", name, e), true),
                )
            }
        }
    }

    fn handle_resource_templates(&self, id: Option<serde_json::Value>) -> McpResponse {
        McpResponse::success(
            id,
            json!({
                "resourceTemplates": [{
                    "uriTemplate": format!("{}{{file_id}}/content", RESOURCE_SCHEME),
                    "name": "Google Drive file content",
                    "description": "Raw content of a Drive file by ID"
                }]
            }),
        )
    }

    async fn handle_resources_read(
        &self,
        id: Option<serde_json::Value>,
        params: serde_json::Value,
    ) -> McpResponse {
        let uri = match params.get("uri").and_then(|v| v.as_str()) {
            Some(u) => u.to_string(),
            None => {
                return McpResponse::error(id, error_codes::INVALID_PARAMS, "Missing 'uri' parameter")
            }
        };

        let tools = match &self.backend {
            Backend::Ready(tools) => tools,
            Backend::Degraded(reason) => {
                return McpResponse::error(
                    id,
                    error_codes::INTERNAL_ERROR,
                    format!("Server failed to initialise: {}", reason),
                )
            }
        };

        match tools.read_resource(&uri).await {
            Ok(ResourceContent::Text(text)) => McpResponse::success(
                id,
                json!({ "contents": [{ "uri": uri, "mimeType": "text/plain", "text": text }] }),
            ),
            Ok(ResourceContent::Blob(blob)) => McpResponse::success(
                id,
                json!({
                    "contents": [{
                        "uri": uri,
                        "mimeType": "application/octet-stream",
                        "blob": blob
                    }]
                }),
            ),
            Err(e) => McpResponse::error(
                id,
                error_codes::RESOURCE_NOT_FOUND,
                format!("Failed to read {}: {:#}", uri, e),
            ),
        }
    }
}
