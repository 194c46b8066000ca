//! OpenAPI 3 import.
//!
//! Parses a JSON or YAML document, runs preflight validation, and derives one
//! [`CatalogEntry`] per `(path, method)` operation. Document-local `$ref`s are
//! resolved for parameters, request bodies, responses and schemas; `allOf`
//! compositions have their `required` lists and `properties` merged.

use serde_json::{Map, Value};
use tollgate_types::{
    CatalogEntry, CatalogParameter, FieldSchema, HttpMethod, ParameterLocation, RequestBodySchema, ResponseDescriptor,
};
use tollgate_util::validate_openapi_preflight;
use tracing::{debug, warn};

use crate::error::CatalogError;

const OPERATION_KEYS: [(&str, HttpMethod); 5] = [
    ("get", HttpMethod::Get),
    ("post", HttpMethod::Post),
    ("put", HttpMethod::Put),
    ("patch", HttpMethod::Patch),
    ("delete", HttpMethod::Delete),
];
const MAX_REF_DEPTH: usize = 16;
const JSON_CONTENT_TYPE: &str = "application/json";

/// Parses, validates and converts an OpenAPI source into catalog entries.
pub fn import_openapi_catalog(source_content: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
    let document = parse_openapi_document_value(source_content)?;
    match validate_openapi_preflight(&document) {
        Ok(advisories) => {
            for advisory in advisories {
                warn!(path = %advisory.path, rule = %advisory.rule, "{}", advisory.message);
            }
        }
        Err(violations) => return Err(CatalogError::PreflightValidation(violations)),
    }

    let entries = derive_catalog_entries(&document);
    debug!(operation_count = entries.len(), "derived catalog entries");
    Ok(entries)
}

/// Accepts JSON first, then YAML.
pub fn parse_openapi_document_value(source_content: &str) -> Result<Value, CatalogError> {
    serde_json::from_str::<Value>(source_content)
        .or_else(|_| serde_yaml::from_str::<Value>(source_content))
        .map_err(|error| CatalogError::SourceParse(error.to_string()))
}

/// Walks `paths` and builds entries. Paths come out in key order, operations in
/// GET, POST, PUT, PATCH, DELETE order.
pub fn derive_catalog_entries(document: &Value) -> Vec<CatalogEntry> {
    let global_requires_auth = security_requires_auth(document.get("security")).unwrap_or(false);
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for (path, path_item) in paths {
        let path_item = resolve_ref_chain(document, path_item);
        for (key, method) in OPERATION_KEYS {
            let Some(operation) = path_item.get(key) else {
                continue;
            };
            entries.push(build_entry(document, path, &path_item, operation, method, global_requires_auth));
        }
    }
    entries
}

fn build_entry(
    root: &Value,
    path: &str,
    path_item: &Value,
    operation: &Value,
    method: HttpMethod,
    global_requires_auth: bool,
) -> CatalogEntry {
    let tags = operation
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    CatalogEntry {
        path: path.to_string(),
        method,
        summary: string_field(operation, "summary").unwrap_or_default(),
        description: string_field(operation, "description"),
        operation_id: string_field(operation, "operationId"),
        tags,
        parameters: collect_parameters(root, path_item, operation),
        request_body: operation
            .get("requestBody")
            .and_then(|request_body| build_request_body(root, request_body)),
        responses: collect_responses(root, operation),
        requires_auth: security_requires_auth(operation.get("security")).unwrap_or(global_requires_auth),
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// `None` when `security` is absent; an empty list or an empty requirement object means anonymous access.
fn security_requires_auth(security: Option<&Value>) -> Option<bool> {
    let requirements = security?.as_array()?;
    Some(
        !requirements.is_empty()
            && requirements
                .iter()
                .all(|requirement| requirement.as_object().is_some_and(|object| !object.is_empty())),
    )
}

fn resolve_local_ref(root: &Value, reference: &str) -> Option<Value> {
    let pointer = reference.strip_prefix('#')?;
    root.pointer(pointer).cloned()
}

/// Follows `$ref` until a concrete object is reached.
fn resolve_ref_chain(root: &Value, value: &Value) -> Value {
    let mut current = value.clone();
    for _ in 0..MAX_REF_DEPTH {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return current;
        };
        match resolve_local_ref(root, reference) {
            Some(resolved) => current = resolved,
            None => return current,
        }
    }
    current
}

/// Resolves refs and flattens `allOf` into a single object schema.
fn resolve_schema(root: &Value, schema: &Value, depth: usize) -> Value {
    let resolved = resolve_ref_chain(root, schema);
    if depth >= MAX_REF_DEPTH {
        return resolved;
    }
    let Some(parts) = resolved.get("allOf").and_then(Value::as_array) else {
        return resolved;
    };

    let mut required = Vec::new();
    let mut properties = Map::new();
    for part in parts {
        let part = resolve_schema(root, part, depth + 1);
        merge_required(&mut required, part.get("required"));
        merge_properties(&mut properties, part.get("properties").and_then(Value::as_object));
    }
    merge_required(&mut required, resolved.get("required"));
    merge_properties(&mut properties, resolved.get("properties").and_then(Value::as_object));

    let mut merged = resolved.as_object().cloned().unwrap_or_default();
    merged.remove("allOf");
    merged.insert("type".into(), Value::String("object".into()));
    merged.insert(
        "required".into(),
        Value::Array(required.into_iter().map(Value::String).collect()),
    );
    merged.insert("properties".into(), Value::Object(properties));
    Value::Object(merged)
}

fn merge_required(into: &mut Vec<String>, from: Option<&Value>) {
    let Some(names) = from.and_then(Value::as_array) else {
        return;
    };
    for name in names.iter().filter_map(Value::as_str) {
        if !into.iter().any(|existing| existing == name) {
            into.push(name.to_string());
        }
    }
}

fn merge_properties(into: &mut Map<String, Value>, from: Option<&Map<String, Value>>) {
    if let Some(properties) = from {
        for (name, schema) in properties {
            into.insert(name.clone(), schema.clone());
        }
    }
}

/// Merges path-level and operation-level parameters. Operation-level entries
/// replace path-level ones with the same name and location.
fn collect_parameters(root: &Value, path_item: &Value, operation: &Value) -> Vec<CatalogParameter> {
    let mut collected: Vec<CatalogParameter> = Vec::new();
    let declared = [path_item.get("parameters"), operation.get("parameters")];
    for raw_parameter in declared
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
    {
        let resolved = resolve_ref_chain(root, raw_parameter);
        let Some(parameter) = build_parameter(root, &resolved) else {
            continue;
        };
        match collected
            .iter()
            .position(|existing| existing.name == parameter.name && existing.location == parameter.location)
        {
            Some(index) => collected[index] = parameter,
            None => collected.push(parameter),
        }
    }
    collected
}

fn build_parameter(root: &Value, parameter: &Value) -> Option<CatalogParameter> {
    let name = string_field(parameter, "name")?;
    let location = match parameter.get("in").and_then(Value::as_str)? {
        "path" => ParameterLocation::Path,
        "query" => ParameterLocation::Query,
        "header" => ParameterLocation::Header,
        _ => return None,
    };
    let schema = parameter
        .get("schema")
        .map(|schema| resolve_schema(root, schema, 0))
        .unwrap_or(Value::Null);

    Some(CatalogParameter {
        name,
        location,
        required: location == ParameterLocation::Path
            || parameter.get("required").and_then(Value::as_bool).unwrap_or(false),
        r#type: schema_type(&schema),
        format: string_field(&schema, "format"),
        description: string_field(parameter, "description"),
        enum_values: enum_values(&schema),
        example: parameter.get("example").or_else(|| schema.get("example")).cloned(),
    })
}

fn build_request_body(root: &Value, request_body: &Value) -> Option<RequestBodySchema> {
    let request_body = resolve_ref_chain(root, request_body);
    let content = request_body.get("content")?.as_object()?;
    let (content_type, media) = content
        .get_key_value(JSON_CONTENT_TYPE)
        .or_else(|| content.iter().next())?;
    let schema = media
        .get("schema")
        .map(|schema| resolve_schema(root, schema, 0))
        .unwrap_or(Value::Null);

    let mut required = Vec::new();
    merge_required(&mut required, schema.get("required"));

    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(name, property)| (name.clone(), build_field_schema(root, property)))
                .collect()
        })
        .unwrap_or_default();

    Some(RequestBodySchema {
        content_type: content_type.clone(),
        required,
        properties,
        example: media.get("example").or_else(|| schema.get("example")).cloned(),
    })
}

fn build_field_schema(root: &Value, property: &Value) -> FieldSchema {
    let property = resolve_schema(root, property, 0);
    FieldSchema {
        r#type: schema_type(&property),
        format: string_field(&property, "format"),
        label: string_field(&property, "title"),
        description: string_field(&property, "description"),
        enum_values: enum_values(&property),
        example: property.get("example").cloned(),
        default: property.get("default").cloned(),
    }
}

fn schema_type(schema: &Value) -> String {
    if let Some(type_name) = schema.get("type").and_then(Value::as_str) {
        return type_name.to_string();
    }
    if schema.get("properties").is_some() {
        return "object".to_string();
    }
    if schema.get("items").is_some() {
        return "array".to_string();
    }
    "string".to_string()
}

fn enum_values(schema: &Value) -> Vec<String> {
    schema
        .get("enum")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .map(|value| match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn collect_responses(root: &Value, operation: &Value) -> Vec<ResponseDescriptor> {
    let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
        return Vec::new();
    };
    responses
        .iter()
        .map(|(status, response)| {
            let response = resolve_ref_chain(root, response);
            ResponseDescriptor {
                status: status.clone(),
                description: string_field(&response, "description").unwrap_or_default(),
            }
        })
        .collect()
}
