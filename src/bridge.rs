//! Request encoding and response decoding for the bridging protocol.
//!
//! Requests are flat JSON objects: a `cmd` field plus the command's
//! parameters at the top level, serialized as a single line with one trailing
//! newline. Responses are decided once at decode time: a top-level `error`
//! key means failure, anything else is the result value unchanged.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::transport::Transport;

/// A named request with its parameters, sent as one JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub params: Map<String, Value>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    /// Serialize as exactly one line: the `cmd` name merged with the
    /// parameters at the top level, terminated by a single newline.
    /// serde_json escapes control characters inside strings, so the trailing
    /// newline is the only raw newline in the output.
    pub fn encode(&self) -> String {
        let mut doc = Map::new();
        doc.insert("cmd".to_string(), Value::String(self.name.clone()));
        for (key, value) in &self.params {
            doc.insert(key.clone(), value.clone());
        }
        let mut line = Value::Object(doc).to_string();
        line.push('\n');
        line
    }
}

/// Decode raw response bytes into the protocol's tagged result.
///
/// Parse failures fold into the same `Err(message)` shape the remote side
/// uses; callers never see a parser error type. Any JSON object carrying a
/// top-level `error` key is a failure regardless of other content.
pub fn decode(bytes: &[u8]) -> Result<Value, String> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| format!("invalid UTF-8 in response: {}", e))?;
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| format!("invalid JSON in response: {}", e))?;

    if let Some(error) = value.get("error") {
        let message = match error.as_str() {
            Some(s) => s.to_string(),
            None => error.to_string(),
        };
        return Err(message);
    }
    Ok(value)
}

/// One full request/response exchange against an endpoint. All failure kinds
/// (transport, decode, application) normalize to `Err(message)`.
pub fn exchange<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &Endpoint,
    command: &Command,
    timeout: Duration,
) -> Result<Value, String> {
    let line = command.encode();
    debug!(cmd = %command.name, port = endpoint.port, timeout_ms = timeout.as_millis() as u64, "dispatching command");
    let bytes = transport
        .call(endpoint, &line, timeout)
        .map_err(|e| e.to_string())?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_is_exactly_one_line() {
        let command = Command::new("modify_node")
            .param("node_path", json!("Main/Label"))
            .param("properties", json!({"text": "line one\nline two"}));

        let line = command.encode();
        assert!(line.ends_with('\n'));
        // No raw newline before the terminator, even with \n inside a string
        let body = &line[..line.len() - 1];
        assert!(!body.contains('\n'), "embedded newline in: {}", body);
    }

    #[test]
    fn test_encode_merges_cmd_with_params() {
        let command = Command::new("get_node_properties").param("node_path", json!("Main"));
        let line = command.encode();
        let doc: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(doc["cmd"], "get_node_properties");
        assert_eq!(doc["node_path"], "Main");
        // Flat document, no nested envelope
        assert!(doc.get("parameters").is_none());
    }

    #[test]
    fn test_decode_error_key_wins_over_other_content() {
        let result = decode(br#"{"error": "node not found", "partial": {"a": 1}}"#);
        assert_eq!(result.unwrap_err(), "node not found");
    }

    #[test]
    fn test_decode_non_string_error_still_fails() {
        let result = decode(br#"{"error": {"code": 3}}"#);
        assert!(result.unwrap_err().contains("3"));
    }

    #[test]
    fn test_decode_success_passes_value_through() {
        let value = json!({"nodes": [{"name": "Main", "type": "Node2D"}], "count": 1});
        let bytes = format!("{}\n", value);
        assert_eq!(decode(bytes.as_bytes()).unwrap(), value);
    }

    #[test]
    fn test_decode_round_trip() {
        for value in [
            json!({"a": 1, "b": [true, null, "x"]}),
            json!([1, 2, 3]),
            json!("bare string"),
            json!(42),
        ] {
            let bytes = format!("{}\n", value);
            assert_eq!(decode(bytes.as_bytes()).unwrap(), value);
        }
    }

    #[test]
    fn test_decode_strips_trailing_whitespace() {
        assert_eq!(decode(b"{\"ok\": true}  \r\n").unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_decode_folds_parse_failure_into_error_shape() {
        let result = decode(b"not json at all\n");
        assert!(result.unwrap_err().contains("invalid JSON"));
    }

    #[test]
    fn test_decode_empty_payload_is_an_error() {
        assert!(decode(b"").is_err());
        assert!(decode(b"  \n").is_err());
    }
}
