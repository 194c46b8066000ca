//! OpenAPI document preflight validation.
//!
//! Runs before a catalog is imported. Blocking violations stop the import;
//! advisory ones are logged by the caller and the import proceeds.

use serde_json::Value;

const HTTP_OPERATION_KEYS: &[&str] = &["get", "post", "put", "patch", "delete"];

/// A structured preflight finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenApiValidationViolation {
    /// JSON path where the violation occurred.
    pub path: String,
    /// Stable rule identifier for machine-readable handling.
    pub rule: String,
    pub message: String,
    /// Blocking violations make the document unusable as a catalog.
    pub blocking: bool,
}

impl OpenApiValidationViolation {
    pub fn blocking(path: impl Into<String>, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            rule: rule.into(),
            message: message.into(),
            blocking: true,
        }
    }

    pub fn advisory(path: impl Into<String>, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            blocking: false,
            ..Self::blocking(path, rule, message)
        }
    }

    pub fn to_json_value(&self) -> Value {
        serde_json::json!({
            "path": self.path,
            "rule": self.rule,
            "message": self.message,
            "blocking": self.blocking,
        })
    }
}

/// Collects every preflight finding for `document`.
///
/// Checks:
/// - `openapi` is a `3.x` version string
/// - `paths` exists and holds at least one GET/POST/PUT/PATCH/DELETE operation
/// - each operation carries a tag (advisory: untagged operations land in no category)
/// - `$ref` values are document-local (advisory: remote refs are not followed)
pub fn collect_openapi_preflight_violations(document: &Value) -> Vec<OpenApiValidationViolation> {
    let mut violations = Vec::new();
    check_version(document, &mut violations);

    let Some(paths) = document.get("paths") else {
        violations.push(OpenApiValidationViolation::blocking(
            "$.paths",
            "paths_required",
            "missing required `paths` object",
        ));
        return violations;
    };
    let Some(paths) = paths.as_object() else {
        violations.push(OpenApiValidationViolation::blocking(
            "$.paths",
            "paths_type",
            "field `paths` must be an object",
        ));
        return violations;
    };

    let mut operation_count = 0usize;
    for (path, path_item) in paths {
        let Some(path_item) = path_item.as_object() else {
            continue;
        };
        for (method, operation) in path_item {
            if !HTTP_OPERATION_KEYS.contains(&method.as_str()) {
                continue;
            }
            operation_count += 1;
            let has_tag = operation
                .get("tags")
                .and_then(Value::as_array)
                .is_some_and(|tags| tags.iter().any(|tag| tag.as_str().is_some_and(|tag| !tag.trim().is_empty())));
            if !has_tag {
                violations.push(OpenApiValidationViolation::advisory(
                    format!("$.paths['{}'].{}", path, method),
                    "operation_tags",
                    "operation has no tags and will not appear under any category",
                ));
            }
        }
    }

    if operation_count == 0 {
        violations.push(OpenApiValidationViolation::blocking(
            "$.paths",
            "operations_presence",
            "no HTTP operations were found under `paths`",
        ));
    }

    collect_remote_refs(document, "$", &mut violations);
    violations
}

fn check_version(document: &Value, violations: &mut Vec<OpenApiValidationViolation>) {
    match document.get("openapi") {
        Some(Value::String(version)) if version.starts_with("3.") => {}
        Some(Value::String(version)) => violations.push(OpenApiValidationViolation::blocking(
            "$.openapi",
            "openapi_version",
            format!("unsupported OpenAPI version '{}'; expected a 3.x document", version),
        )),
        Some(_) => violations.push(OpenApiValidationViolation::blocking(
            "$.openapi",
            "openapi_version",
            "field `openapi` must be a string and start with `3.`",
        )),
        None => match document.get("swagger").and_then(Value::as_str) {
            Some(swagger_version) => violations.push(OpenApiValidationViolation::blocking(
                "$.swagger",
                "openapi_version",
                format!(
                    "Swagger/OpenAPI 2.x document detected ('{}'); OpenAPI 3.x is required",
                    swagger_version
                ),
            )),
            None => violations.push(OpenApiValidationViolation::blocking(
                "$.openapi",
                "openapi_version",
                "missing required `openapi` field; expected an OpenAPI 3.x document",
            )),
        },
    }
}

fn collect_remote_refs(value: &Value, json_path: &str, violations: &mut Vec<OpenApiValidationViolation>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "$ref"
                    && let Some(reference) = child.as_str()
                    && !reference.starts_with("#/")
                {
                    violations.push(OpenApiValidationViolation::advisory(
                        json_path,
                        "external_ref",
                        format!("reference '{}' is not document-local and will be ignored", reference),
                    ));
                    continue;
                }
                collect_remote_refs(child, &format!("{}.{}", json_path, key), violations);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_remote_refs(child, &format!("{}[{}]", json_path, index), violations);
            }
        }
        _ => {}
    }
}

/// Returns `Ok(advisories)` when no blocking violation exists, otherwise every blocking violation.
pub fn validate_openapi_preflight(
    document: &Value,
) -> Result<Vec<OpenApiValidationViolation>, Vec<OpenApiValidationViolation>> {
    let (blocking, advisory): (Vec<_>, Vec<_>) = collect_openapi_preflight_violations(document)
        .into_iter()
        .partition(|violation| violation.blocking);
    if blocking.is_empty() {
        return Ok(advisory);
    }
    Err(blocking)
}
