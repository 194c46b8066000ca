//! Shapes the payload attached to MCP HTTP log entries.

use serde_json::{Map, Value, json};

const MAX_LOGGED_RESPONSE_BYTES: usize = 256 * 1024;

/// Combines request and response into one payload; `None` when both are absent.
///
/// Responses larger than the logging limit are replaced by a size marker.
pub(crate) fn build_log_payload(request: Option<Value>, response: Option<Value>) -> Option<Value> {
    let mut payload = Map::new();
    if let Some(request) = request {
        payload.insert("request".to_string(), request);
    }
    if let Some(response) = response {
        let size = serde_json::to_vec(&response).map(|bytes| bytes.len()).unwrap_or(0);
        let response = if size > MAX_LOGGED_RESPONSE_BYTES {
            json!({ "truncated": true, "bytes": size })
        } else {
            response
        };
        payload.insert("response".to_string(), response);
    }
    if payload.is_empty() { None } else { Some(Value::Object(payload)) }
}
