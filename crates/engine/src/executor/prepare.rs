use serde_json::{Map, Value};
use tollgate_types::{CatalogEntry, ExecuteOperationRequest};
use tollgate_util::{build_path, placeholder_names};

use super::transport::TransportRequest;

/// Collects values for the entry's path placeholders.
///
/// Segments captured from a concrete request path win; the query map supplies
/// the rest. Blank and `null` values are left out so they surface as missing.
pub fn collect_path_values(
    entry: &CatalogEntry,
    captured: &Map<String, Value>,
    query: &Map<String, Value>,
) -> Map<String, Value> {
    let mut path_values = Map::new();
    for name in placeholder_names(&entry.path) {
        let value = captured.get(&name).or_else(|| query.get(&name));
        if let Some(value) = value.filter(|value| !is_blank(value)) {
            path_values.insert(name, value.clone());
        }
    }
    path_values
}

/// Builds the outbound request for a validated operation.
///
/// Placeholder values are substituted (percent-encoded) into the path and
/// removed from the query; what remains becomes the query string. The body is
/// attached only for POST, PUT and PATCH.
pub fn prepare_request(
    entry: &CatalogEntry,
    request: &ExecuteOperationRequest,
    path_values: &Map<String, Value>,
    bearer_token: Option<&str>,
) -> TransportRequest {
    let path = build_path(&entry.path, path_values);
    let query = request
        .query
        .iter()
        .filter(|(key, _)| !path_values.contains_key(*key))
        .flat_map(|(key, value)| query_pairs(key, value))
        .collect();
    let body = if entry.method.carries_body() {
        request.body.clone()
    } else {
        None
    };

    TransportRequest {
        method: entry.method,
        path,
        query,
        body,
        bearer_token: bearer_token.map(str::to_string),
    }
}

/// Missing key, `null`, or a blank string.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Arrays repeat the key; `null` values are dropped.
fn query_pairs(key: &str, value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().flat_map(|item| query_pairs(key, item)).collect(),
        Value::String(text) => vec![(key.to_string(), text.clone())],
        other => vec![(key.to_string(), other.to_string())],
    }
}
