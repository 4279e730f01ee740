//! MCP JSON-RPC 2.0 protocol handler.
//!
//! Handles request parsing, method routing, and response generation for the
//! tool surface. Supported methods: `initialize`, `tools/list`, `tools/call`.
//!
//! JSON-RPC 2.0 format:
//! - Request: {"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}
//! - Success: {"jsonrpc":"2.0","id":1,"result":{"tools":[]}}
//! - Error: {"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog;
use crate::config::Config;
use crate::tools;
use crate::transport::Transport;

/// JSON-RPC 2.0 version string
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 standard error codes
pub mod error_codes {
    /// Invalid JSON was received
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist / is not available
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameter(s)
    pub const INVALID_PARAMS: i32 = -32602;
}

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Request identifier (string, number, or null)
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 Error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Parse a JSON string into a JsonRpcRequest.
pub fn parse_request(text: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        JsonRpcResponse::error(
            Value::Null,
            error_codes::PARSE_ERROR,
            format!("Parse error: {}", e),
        )
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);

    let jsonrpc = value.get("jsonrpc").and_then(|v| v.as_str()).ok_or_else(|| {
        JsonRpcResponse::error(
            id.clone(),
            error_codes::INVALID_REQUEST,
            "Missing or invalid 'jsonrpc' field",
        )
    })?;
    if jsonrpc != JSONRPC_VERSION {
        return Err(JsonRpcResponse::error(
            id,
            error_codes::INVALID_REQUEST,
            format!(
                "Invalid jsonrpc version: expected '{}', got '{}'",
                JSONRPC_VERSION, jsonrpc
            ),
        ));
    }

    let method = value.get("method").and_then(|v| v.as_str()).ok_or_else(|| {
        JsonRpcResponse::error(id.clone(), error_codes::INVALID_REQUEST, "Missing 'method' field")
    })?;

    let params = value
        .get("params")
        .cloned()
        .unwrap_or(Value::Object(Default::default()));

    Ok(JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        method: method.to_string(),
        params,
    })
}

/// Handle an MCP JSON-RPC request against the bridge.
pub fn handle_request<T: Transport + ?Sized>(
    request: JsonRpcRequest,
    transport: &T,
    config: &Config,
) -> JsonRpcResponse {
    if request.jsonrpc != JSONRPC_VERSION {
        return JsonRpcResponse::error(
            request.id,
            error_codes::INVALID_REQUEST,
            format!("Invalid jsonrpc version: {}", request.jsonrpc),
        );
    }

    match request.method.as_str() {
        "initialize" => handle_initialize(request),
        "tools/list" => handle_tools_list(request),
        "tools/call" => handle_tools_call(request, transport, config),
        other => JsonRpcResponse::error(
            request.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        ),
    }
}

fn handle_initialize(request: JsonRpcRequest) -> JsonRpcResponse {
    JsonRpcResponse::success(
        request.id,
        json!({
            "serverInfo": {
                "name": "godot-mcp",
                "version": crate::VERSION,
            },
            "capabilities": {
                "tools": { "listChanged": false },
            },
        }),
    )
}

fn handle_tools_list(request: JsonRpcRequest) -> JsonRpcResponse {
    let definitions = tools::tool_definitions();
    let tools_json = serde_json::to_value(&definitions).unwrap_or_else(|_| json!([]));
    JsonRpcResponse::success(request.id, json!({ "tools": tools_json }))
}

fn handle_tools_call<T: Transport + ?Sized>(
    request: JsonRpcRequest,
    transport: &T,
    config: &Config,
) -> JsonRpcResponse {
    let Some(params) = request.params.as_object() else {
        return JsonRpcResponse::error(
            request.id,
            error_codes::INVALID_PARAMS,
            "Invalid params: expected object",
        );
    };

    let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::error(
            request.id.clone(),
            error_codes::INVALID_PARAMS,
            "Missing required parameter: name",
        );
    };

    if catalog::find(tool_name).is_none() {
        return JsonRpcResponse::error(
            request.id.clone(),
            error_codes::METHOD_NOT_FOUND,
            format!("Tool not found: {}", tool_name),
        );
    }

    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    let result = tools::handle_tool_call(transport, config, tool_name, &arguments);
    JsonRpcResponse::success(
        request.id.clone(),
        serde_json::to_value(result).unwrap_or_else(|_| json!({})),
    )
}
