use serde_json::{Map, Value, json};
use tollgate_types::{CatalogEntry, CatalogParameter, FieldSchema};

/// Copy-and-fill arguments for `execute_operation`.
///
/// Lists every declared path parameter, required query parameter and body
/// property. Values are schema defaults or empty placeholders; nothing here is
/// meant to be sent as-is.
pub fn fill_in_template(entry: &CatalogEntry) -> Value {
    let query: Map<String, Value> = template_parameters(entry)
        .map(|parameter| (parameter.name.clone(), empty_value(&parameter.r#type)))
        .collect();
    let body = entry.request_body.as_ref().filter(|_| entry.method.carries_body()).map(|schema| {
        schema
            .properties
            .iter()
            .map(|(name, field)| (name.clone(), field.default.clone().unwrap_or_else(|| empty_value(&field.r#type))))
            .collect::<Map<String, Value>>()
    });
    arguments(query, body)
}

/// A fully worked argument set built from schema examples, or type-based
/// samples where the schema has none.
pub fn worked_example(entry: &CatalogEntry) -> Value {
    let query: Map<String, Value> = template_parameters(entry)
        .map(|parameter| {
            let value = parameter
                .example
                .clone()
                .or_else(|| parameter.enum_values.first().map(|value| Value::String(value.clone())))
                .unwrap_or_else(|| sample_value(&parameter.r#type, parameter.format.as_deref(), &parameter.name));
            (parameter.name.clone(), value)
        })
        .collect();
    let body = entry.request_body.as_ref().filter(|_| entry.method.carries_body()).map(|schema| {
        let documented = schema.example.as_ref().and_then(Value::as_object);
        schema
            .properties
            .iter()
            .map(|(name, field)| {
                let value = documented
                    .and_then(|example| example.get(name).cloned())
                    .unwrap_or_else(|| field_example(name, field));
                (name.clone(), value)
            })
            .collect::<Map<String, Value>>()
    });
    arguments(query, body)
}

fn template_parameters(entry: &CatalogEntry) -> impl Iterator<Item = &CatalogParameter> {
    entry
        .path_parameters()
        .chain(entry.query_parameters().filter(|parameter| parameter.required))
}

fn arguments(query: Map<String, Value>, body: Option<Map<String, Value>>) -> Value {
    let mut arguments = Map::new();
    arguments.insert("query".to_string(), Value::Object(query));
    if let Some(body) = body {
        arguments.insert("body".to_string(), Value::Object(body));
    }
    Value::Object(arguments)
}

fn field_example(name: &str, field: &FieldSchema) -> Value {
    field
        .example
        .clone()
        .or_else(|| field.default.clone())
        .or_else(|| field.enum_values.first().map(|value| Value::String(value.clone())))
        .unwrap_or_else(|| sample_value(&field.r#type, field.format.as_deref(), name))
}

fn empty_value(schema_type: &str) -> Value {
    match schema_type {
        "string" | "" => Value::String(String::new()),
        "array" => json!([]),
        "object" => json!({}),
        _ => Value::Null,
    }
}

fn sample_value(schema_type: &str, format: Option<&str>, name: &str) -> Value {
    match (schema_type, format) {
        (_, Some("date")) => json!("2025-09-01"),
        (_, Some("date-time")) => json!("2025-09-01T09:00:00"),
        (_, Some("time")) => json!("09:00"),
        (_, Some("email")) => json!("parent@example.com"),
        ("integer", _) => json!(1),
        ("number", _) => json!(1.0),
        ("boolean", _) => json!(true),
        ("array", _) => json!([]),
        ("object", _) => json!({}),
        _ => json!(format!("sample {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_registry::CatalogIndex;
    use tollgate_types::HttpMethod;

    #[test]
    fn template_lists_every_declared_body_field_empty() {
        let catalog = CatalogIndex::from_embedded().unwrap();
        let entry = catalog.resolve("/api/students", HttpMethod::Post).unwrap().entry;

        let template = fill_in_template(entry);

        let body = template["body"].as_object().unwrap();
        assert_eq!(body.len(), entry.request_body.as_ref().unwrap().properties.len());
        assert_eq!(body["name"], json!(""));
        assert_eq!(body["classId"], Value::Null);
    }

    #[test]
    fn example_prefers_schema_examples() {
        let catalog = CatalogIndex::from_embedded().unwrap();
        let entry = catalog.resolve("/api/students", HttpMethod::Post).unwrap().entry;

        let example = worked_example(entry);

        assert_eq!(example["body"]["name"], json!("小明"));
        assert_eq!(example["body"]["birthDate"], json!("2020-05-01"));
    }

    #[test]
    fn path_only_operations_template_their_placeholders() {
        let catalog = CatalogIndex::from_embedded().unwrap();
        let entry = catalog.resolve("/api/students/{id}", HttpMethod::Delete).unwrap().entry;

        assert_eq!(fill_in_template(entry), json!({"query": {"id": null}}));
        assert_eq!(worked_example(entry), json!({"query": {"id": 7}}));
    }

    #[test]
    fn samples_follow_type_and_format() {
        assert_eq!(sample_value("string", Some("date"), "day"), json!("2025-09-01"));
        assert_eq!(sample_value("integer", None, "count"), json!(1));
        assert_eq!(sample_value("string", None, "nickname"), json!("sample nickname"));
    }
}
