use std::fmt::Write as _;

use serde_json::{Map, Value};
use tollgate_types::{CatalogEntry, CatalogMiss, CatalogMissKind, HttpMethod, NextAction, OperationDetail};

use crate::models::CatalogIndex;

/// Expands one operation into its full contract.
///
/// `endpoint` may be the template or a concrete path. A known path with an
/// unavailable method yields a miss listing the methods that do exist.
pub fn get_operation_detail(catalog: &CatalogIndex, endpoint: &str, method: HttpMethod) -> Result<OperationDetail, CatalogMiss> {
    let Some(resolved) = catalog.resolve(endpoint, method) else {
        return Err(operation_miss(catalog, endpoint, method));
    };
    let entry = resolved.entry;

    Ok(OperationDetail {
        path: entry.path.clone(),
        method: entry.method,
        summary: entry.summary.clone(),
        description: entry.description.clone(),
        operation_id: entry.operation_id.clone(),
        tags: entry.tags.clone(),
        parameters: entry.parameters.clone(),
        request_body: entry.request_body.clone(),
        responses: entry.responses.clone(),
        requires_auth: entry.requires_auth,
        requires_confirmation: entry.is_mutating(),
        rendered_summary: render_operation_summary(entry),
        next_action: NextAction::ExecuteOperation,
        instruction: execution_instruction(entry),
    })
}

/// Builds the miss returned when `(endpoint, method)` is not in the catalog.
pub fn operation_miss(catalog: &CatalogIndex, endpoint: &str, method: HttpMethod) -> CatalogMiss {
    let available_methods = catalog.methods_for_path(endpoint);
    if available_methods.is_empty() {
        return CatalogMiss {
            kind: CatalogMissKind::UnknownPath,
            message: format!("no operation exists for path '{}'", endpoint),
            category: None,
            path: Some(endpoint.to_string()),
            method: Some(method),
            available_methods,
            next_action: NextAction::RerunEndpointLister,
            instruction: "Call list_endpoints for the category and use a path exactly as listed.".to_string(),
        };
    }

    let listed = available_methods
        .iter()
        .map(HttpMethod::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    CatalogMiss {
        kind: CatalogMissKind::MethodNotAvailable,
        message: format!("{} is not available for '{}'; available methods: {}", method, endpoint, listed),
        category: None,
        path: Some(endpoint.to_string()),
        method: Some(method),
        available_methods,
        next_action: NextAction::RerunEndpointLister,
        instruction: "Retry with one of the available methods, or call list_endpoints to pick a different endpoint.".to_string(),
    }
}

fn execution_instruction(entry: &CatalogEntry) -> String {
    if !entry.is_mutating() {
        return "Call execute_operation now with the path parameters and any query arguments.".to_string();
    }
    "Call execute_operation with the values the user supplied. Do not invent values for required fields; \
     missing values come back as a fill-in template. When updating or deleting by name, look the record up \
     with a GET first and use its id."
        .to_string()
}

/// Plain-text rendering of an operation contract.
pub fn render_operation_summary(entry: &CatalogEntry) -> String {
    let mut rendered = String::new();
    let _ = writeln!(rendered, "{} {}", entry.method, entry.path);
    if !entry.summary.is_empty() {
        let _ = writeln!(rendered, "{}", entry.summary);
    }
    if let Some(description) = &entry.description {
        let _ = writeln!(rendered, "{}", description);
    }

    let path_parameters: Vec<_> = entry.path_parameters().collect();
    if !path_parameters.is_empty() {
        let _ = writeln!(rendered, "\nPath parameters:");
        for parameter in path_parameters {
            let _ = writeln!(rendered, "  - {} ({}, required){}", parameter.name, parameter.r#type, describe(&parameter.description));
        }
    }

    let query_parameters: Vec<_> = entry.query_parameters().collect();
    if !query_parameters.is_empty() {
        let _ = writeln!(rendered, "\nQuery parameters:");
        for parameter in query_parameters {
            let requirement = if parameter.required { "required" } else { "optional" };
            let _ = write!(rendered, "  - {} ({}, {}){}", parameter.name, parameter.r#type, requirement, describe(&parameter.description));
            if !parameter.enum_values.is_empty() {
                let _ = write!(rendered, " [one of: {}]", parameter.enum_values.join(", "));
            }
            rendered.push('\n');
        }
    }

    if let Some(body) = &entry.request_body {
        let _ = writeln!(rendered, "\nRequest body ({}):", body.content_type);
        for (name, field) in &body.properties {
            let requirement = if body.required.contains(name) { "required" } else { "optional" };
            let _ = write!(rendered, "  - {} ({}, {}): {}", name, field.r#type, requirement, field.display_label(name));
            if let Some(format) = &field.format {
                let _ = write!(rendered, " [format: {}]", format);
            }
            if !field.enum_values.is_empty() {
                let _ = write!(rendered, " [one of: {}]", field.enum_values.join(", "));
            }
            rendered.push('\n');
        }
        let example = body.example.clone().unwrap_or_else(|| example_from_properties(entry));
        if example.as_object().is_some_and(|object| !object.is_empty()) {
            let _ = writeln!(rendered, "Example body: {}", example);
        }
    }

    if !entry.responses.is_empty() {
        let _ = writeln!(rendered, "\nResponses:");
        for response in &entry.responses {
            let _ = writeln!(rendered, "  - {}: {}", response.status, response.description);
        }
    }

    let auth = if entry.requires_auth {
        "Requires authentication (bearer token)."
    } else {
        "No authentication required."
    };
    let _ = writeln!(rendered, "\n{}", auth);
    if entry.is_mutating() {
        let _ = writeln!(rendered, "Mutating operation: requires explicit user confirmation before it runs.");
    }
    rendered.trim_end().to_string()
}

fn describe(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|text| format!(": {}", text))
        .unwrap_or_default()
}

fn example_from_properties(entry: &CatalogEntry) -> Value {
    let Some(body) = &entry.request_body else {
        return Value::Null;
    };
    let example: Map<String, Value> = body
        .properties
        .iter()
        .filter_map(|(name, field)| field.example.clone().map(|value| (name.clone(), value)))
        .collect();
    Value::Object(example)
}
