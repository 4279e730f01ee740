//! MCP tool surface over the command catalogue.
//!
//! One generic dispatcher executes every catalogue entry: build the wire
//! command from the caller's arguments, resolve the endpoint, run a single
//! exchange, then apply the entry's post-processing. Failures of every kind
//! (transport, decode, application, missing image data) surface as a tool
//! result with `isError` set, carrying the message.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::bridge;
use crate::catalog::{self, Post, ToolSpec};
use crate::config::Config;
use crate::transport::Transport;

/// Tool definition for the MCP tools/list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// Content item in a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }

    pub fn png(data: &[u8]) -> Self {
        Self {
            content: vec![ToolContent::Image {
                data: BASE64.encode(data),
                mime_type: "image/png".to_string(),
            }],
            is_error: None,
        }
    }
}

/// Tool definitions for every catalogue entry.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    catalog::CATALOG
        .iter()
        .map(|spec| ToolDefinition {
            name: spec.name.to_string(),
            description: spec.description.to_string(),
            input_schema: input_schema(spec),
        })
        .collect()
}

fn input_schema(spec: &ToolSpec) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in spec.params {
        properties.insert(
            param.name.to_string(),
            json!({"type": param.kind.schema_type()}),
        );
        if param.required {
            required.push(Value::String(param.name.to_string()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Execute one tool call against the bridge.
pub fn handle_tool_call<T: Transport + ?Sized>(
    transport: &T,
    config: &Config,
    name: &str,
    arguments: &Value,
) -> ToolResult {
    let Some(spec) = catalog::find(name) else {
        return ToolResult::error(format!("unknown tool: {}", name));
    };

    let command = match catalog::build_command(spec, arguments) {
        Ok(command) => command,
        Err(message) => return ToolResult::error(message),
    };

    let endpoint = spec.target.endpoint(config);
    let timeout = spec.timeout.unwrap_or(endpoint.default_timeout);

    let outcome = bridge::exchange(transport, &endpoint, &command, timeout);
    match spec.post {
        Post::PrettyJson => match outcome {
            Ok(value) => ToolResult::text(pretty(&value)),
            Err(message) => {
                warn!(tool = name, error = %message, "tool call failed");
                ToolResult::error(message)
            }
        },
        Post::PngImage => match outcome.and_then(|value| decode_screenshot(&value)) {
            Ok(data) => ToolResult::png(&data),
            Err(message) => {
                warn!(tool = name, error = %message, "tool call failed");
                ToolResult::error(message)
            }
        },
    }
}

/// Extract and decode the PNG payload from a successful screenshot result.
/// A missing or empty `image_base64` field is its own failure, distinct from
/// a base64 decode error.
pub fn decode_screenshot(value: &Value) -> Result<Vec<u8>, String> {
    let encoded = value
        .get("image_base64")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "no image data in response".to_string())?;
    BASE64
        .decode(encoded)
        .map_err(|e| format!("invalid image data: {}", e))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{Endpoint, DEFAULT_TIMEOUT, EDITOR_PORT, GAME_PORT, SCREENSHOT_TIMEOUT};
    use crate::transport::TransportError;
    use std::cell::RefCell;
    use std::time::Duration;

    /// Records every call and answers each one with the canned reply.
    struct MockTransport {
        reply: Result<Vec<u8>, String>,
        calls: RefCell<Vec<(u16, String, Duration)>>,
    }

    impl MockTransport {
        fn replying(reply: &[u8]) -> Self {
            Self {
                reply: Ok(reply.to_vec()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                reply: Err("unreachable".to_string()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn last_call(&self) -> (u16, String, Duration) {
            self.calls.borrow().last().cloned().expect("no calls made")
        }
    }

    impl Transport for MockTransport {
        fn call(
            &self,
            endpoint: &Endpoint,
            line: &str,
            timeout: Duration,
        ) -> Result<Vec<u8>, TransportError> {
            self.calls
                .borrow_mut()
                .push((endpoint.port, line.to_string(), timeout));
            match &self.reply {
                Ok(bytes) => Ok(bytes.clone()),
                Err(_) => Err(TransportError::Unreachable {
                    endpoint: endpoint.name,
                    port: endpoint.port,
                }),
            }
        }
    }

    fn error_text(result: &ToolResult) -> &str {
        assert_eq!(result.is_error, Some(true));
        match &result.content[0] {
            ToolContent::Text { text } => text,
            other => panic!("expected text content, got {:?}", other),
        }
    }

    #[test]
    fn test_definitions_cover_the_whole_catalog() {
        let definitions = tool_definitions();
        assert_eq!(definitions.len(), catalog::CATALOG.len());

        let names: Vec<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"get_scene_tree"));
        assert!(names.contains(&"screenshot"));
        assert!(names.contains(&"undo"));
        assert!(names.contains(&"click"));
    }

    #[test]
    fn test_input_schema_marks_required_params() {
        let definitions = tool_definitions();
        let create = definitions.iter().find(|d| d.name == "create_node").unwrap();

        assert_eq!(create.input_schema["type"], "object");
        assert_eq!(
            create.input_schema["properties"]["parent_path"]["type"],
            "string"
        );
        let required = create.input_schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 3);
    }

    #[test]
    fn test_screenshot_uses_long_timeout_and_tree_query_uses_default() {
        let transport = MockTransport::replying(b"{\"image_base64\": \"aGk=\"}\n");
        handle_tool_call(&transport, &Config::default(), "screenshot", &json!({}));
        let (port, _, timeout) = transport.last_call();
        assert_eq!(port, GAME_PORT);
        assert_eq!(timeout, SCREENSHOT_TIMEOUT);

        let transport = MockTransport::replying(b"{\"nodes\": []}\n");
        handle_tool_call(&transport, &Config::default(), "get_scene_tree", &json!({}));
        let (port, _, timeout) = transport.last_call();
        assert_eq!(port, EDITOR_PORT);
        assert_eq!(timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_game_port_override_routes_game_commands() {
        let config = Config { game_port: 9912 };
        let transport = MockTransport::replying(b"{\"clicked\": true}\n");
        handle_tool_call(&transport, &config, "click", &json!({"x": 10.0, "y": 20.0}));
        let (port, line, _) = transport.last_call();
        assert_eq!(port, 9912);

        let doc: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(doc["cmd"], "click");
        assert_eq!(doc["x"], 10.0);
        assert_eq!(doc["y"], 20.0);
    }

    #[test]
    fn test_pass_through_pretty_prints_the_result() {
        let transport = MockTransport::replying(b"{\"scene\": \"main.tscn\", \"running\": false}\n");
        let result = handle_tool_call(
            &transport,
            &Config::default(),
            "get_editor_state",
            &json!({}),
        );

        assert_eq!(result.is_error, None);
        let ToolContent::Text { text } = &result.content[0] else {
            panic!("expected text content");
        };
        let expected = serde_json::to_string_pretty(
            &json!({"scene": "main.tscn", "running": false}),
        )
        .unwrap();
        assert_eq!(text, &expected);
    }

    #[test]
    fn test_application_error_passes_through_verbatim() {
        let transport =
            MockTransport::replying(b"{\"error\": \"Node not found: Main/Ghost\", \"extra\": 1}\n");
        let result = handle_tool_call(
            &transport,
            &Config::default(),
            "delete_node",
            &json!({"node_path": "Main/Ghost"}),
        );
        assert_eq!(error_text(&result), "Node not found: Main/Ghost");
    }

    #[test]
    fn test_transport_failure_becomes_tool_error() {
        let transport = MockTransport::unreachable();
        let result = handle_tool_call(&transport, &Config::default(), "get_runtime_tree", &json!({}));
        let text = error_text(&result);
        assert!(text.contains("game"), "{}", text);
        assert!(text.contains("is it running?"), "{}", text);
    }

    #[test]
    fn test_screenshot_decodes_base64_byte_for_byte() {
        let payload: &[u8] = b"\x89PNG\r\n\x1a\nfakepng";
        let reply = format!("{{\"image_base64\": \"{}\"}}\n", BASE64.encode(payload));
        let transport = MockTransport::replying(reply.as_bytes());

        let result = handle_tool_call(&transport, &Config::default(), "screenshot", &json!({}));
        assert_eq!(result.is_error, None);
        let ToolContent::Image { data, mime_type } = &result.content[0] else {
            panic!("expected image content");
        };
        assert_eq!(mime_type, "image/png");
        assert_eq!(BASE64.decode(data).unwrap(), payload);
    }

    #[test]
    fn test_screenshot_empty_image_field_is_a_failure() {
        let transport = MockTransport::replying(b"{\"image_base64\": \"\"}\n");
        let result = handle_tool_call(&transport, &Config::default(), "screenshot", &json!({}));
        assert_eq!(error_text(&result), "no image data in response");
    }

    #[test]
    fn test_screenshot_missing_image_field_is_a_failure() {
        let transport = MockTransport::replying(b"{\"ok\": true}\n");
        let result = handle_tool_call(&transport, &Config::default(), "screenshot", &json!({}));
        assert_eq!(error_text(&result), "no image data in response");
    }

    #[test]
    fn test_screenshot_error_response_raises_not_returns_image() {
        let transport = MockTransport::replying(b"{\"error\": \"game not running\"}\n");
        let result = handle_tool_call(&transport, &Config::default(), "screenshot", &json!({}));
        assert_eq!(error_text(&result), "game not running");
    }

    #[test]
    fn test_screenshot_invalid_base64_is_a_decode_failure() {
        let transport = MockTransport::replying(b"{\"image_base64\": \"%%%not-base64%%%\"}\n");
        let result = handle_tool_call(&transport, &Config::default(), "screenshot", &json!({}));
        assert!(error_text(&result).contains("invalid image data"));
    }

    #[test]
    fn test_read_only_query_is_idempotent() {
        let transport = MockTransport::replying(b"{\"scene\": \"main.tscn\"}\n");
        let first = handle_tool_call(&transport, &Config::default(), "get_editor_state", &json!({}));
        let second = handle_tool_call(&transport, &Config::default(), "get_editor_state", &json!({}));
        assert_eq!(first, second);

        let calls = transport.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
    }

    #[test]
    fn test_unknown_tool_is_an_error() {
        let transport = MockTransport::replying(b"{}\n");
        let result = handle_tool_call(&transport, &Config::default(), "no_such_tool", &json!({}));
        assert!(error_text(&result).contains("unknown tool"));
        assert!(transport.calls.borrow().is_empty());
    }

    #[test]
    fn test_invalid_arguments_never_reach_the_wire() {
        let transport = MockTransport::replying(b"{}\n");
        let result = handle_tool_call(&transport, &Config::default(), "delete_node", &json!({}));
        assert_eq!(result.is_error, Some(true));
        assert!(transport.calls.borrow().is_empty());
    }

    #[test]
    fn test_empty_response_is_reported_as_such() {
        struct EmptyTransport;
        impl Transport for EmptyTransport {
            fn call(
                &self,
                _endpoint: &Endpoint,
                _line: &str,
                _timeout: Duration,
            ) -> Result<Vec<u8>, TransportError> {
                Err(TransportError::EmptyResponse)
            }
        }
        let result =
            handle_tool_call(&EmptyTransport, &Config::default(), "get_scene_tree", &json!({}));
        assert!(error_text(&result).contains("empty response"));
    }
}
