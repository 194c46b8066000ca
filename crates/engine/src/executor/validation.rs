//! Required-field check.
//!
//! Pure over `(schema, arguments)`: it reports gaps and never supplies values.

use serde_json::{Map, Value};
use tollgate_types::{CatalogEntry, FieldLocation, FieldSchema, MissingField};
use tollgate_util::placeholder_names;

use super::prepare::is_blank;

/// Lists every required value absent from the call, in path, query, body order.
///
/// `path_values` must already merge captured segments and query-supplied
/// placeholder values. Path placeholders are checked for every method; required
/// query parameters only for mutating methods, so reads run with whatever the
/// caller supplied. Body fields are checked only for methods that carry a body.
pub fn missing_required_fields(
    entry: &CatalogEntry,
    path_values: &Map<String, Value>,
    query: &Map<String, Value>,
    body: Option<&Value>,
) -> Vec<MissingField> {
    let mut missing = Vec::new();

    for name in placeholder_names(&entry.path) {
        if path_values.contains_key(&name) {
            continue;
        }
        let declared = entry.path_parameters().find(|parameter| parameter.name == name);
        missing.push(MissingField {
            label: declared
                .and_then(|parameter| parameter.description.clone())
                .unwrap_or_else(|| name.clone()),
            r#type: declared
                .map(|parameter| parameter.r#type.clone())
                .unwrap_or_else(|| "string".to_string()),
            location: FieldLocation::Path,
            format: declared.and_then(|parameter| parameter.format.clone()),
            description: declared.and_then(|parameter| parameter.description.clone()),
            enum_values: Vec::new(),
            placeholder: None,
            name,
        });
    }

    let required_query = entry
        .query_parameters()
        .filter(|parameter| parameter.required && entry.method.is_mutating());
    for parameter in required_query {
        if query.get(&parameter.name).is_some_and(|value| !is_blank(value)) {
            continue;
        }
        missing.push(MissingField {
            name: parameter.name.clone(),
            label: parameter.description.clone().unwrap_or_else(|| parameter.name.clone()),
            r#type: parameter.r#type.clone(),
            location: FieldLocation::Query,
            format: parameter.format.clone(),
            description: parameter.description.clone(),
            enum_values: parameter.enum_values.clone(),
            placeholder: format_placeholder(parameter.format.as_deref()),
        });
    }

    let Some(schema) = entry.request_body.as_ref().filter(|_| entry.method.carries_body()) else {
        return missing;
    };
    let body_fields = body.and_then(Value::as_object);
    for name in &schema.required {
        if body_fields
            .and_then(|fields| fields.get(name))
            .is_some_and(|value| !is_blank(value))
        {
            continue;
        }
        let field = schema.properties.get(name).cloned().unwrap_or_default();
        missing.push(body_field(name, &field));
    }
    missing
}

fn body_field(name: &str, field: &FieldSchema) -> MissingField {
    MissingField {
        name: name.to_string(),
        label: field.display_label(name),
        r#type: if field.r#type.is_empty() {
            "string".to_string()
        } else {
            field.r#type.clone()
        },
        location: FieldLocation::Body,
        format: field.format.clone(),
        description: field.description.clone(),
        enum_values: field.enum_values.clone(),
        placeholder: format_placeholder(field.format.as_deref()),
    }
}

/// Input hint for formatted strings.
pub fn format_placeholder(format: Option<&str>) -> Option<String> {
    match format? {
        "date" => Some("YYYY-MM-DD".to_string()),
        "date-time" => Some("YYYY-MM-DDTHH:MM:SS".to_string()),
        "time" => Some("HH:MM".to_string()),
        "email" => Some("name@example.com".to_string()),
        _ => None,
    }
}
