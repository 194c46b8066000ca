//! Catalog model: one [`CatalogEntry`] per `(path, method)` operation described
//! by the loaded OpenAPI document.
//!
//! Entries are immutable once the index is built. Field order inside request
//! bodies follows authoring order (via `IndexMap`) so fill-in templates render
//! fields the way the document declares them.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// HTTP verbs understood by the catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Display order used when grouping endpoints.
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Returns true for verbs that change server state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }

    /// Returns true for verbs that overwrite or remove existing records.
    pub fn is_destructive(&self) -> bool {
        matches!(self, HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete)
    }

    /// Returns true when arguments travel in a JSON body rather than the query string.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    /// Classifies the verb for confirmation prompts.
    pub fn operation_type(&self) -> OperationType {
        match self {
            HttpMethod::Get => OperationType::Read,
            HttpMethod::Post => OperationType::Create,
            HttpMethod::Put | HttpMethod::Patch => OperationType::Update,
            HttpMethod::Delete => OperationType::Delete,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported HTTP method '{0}'")]
pub struct ParseHttpMethodError(pub String);

impl FromStr for HttpMethod {
    type Err = ParseHttpMethodError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(ParseHttpMethodError(value.to_string())),
        }
    }
}

/// Business meaning of an operation as presented to a human.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Read,
    Create,
    Update,
    Delete,
}

impl OperationType {
    pub fn verb(&self) -> &'static str {
        match self {
            OperationType::Read => "read",
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
        }
    }
}

/// Where a declared parameter is carried.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

/// A path, query or header parameter declared by an operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogParameter {
    pub name: String,
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    /// Primitive JSON schema type (`string`, `integer`, ...).
    #[serde(default)]
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// Schema of a single request body property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FieldSchema {
    #[serde(default)]
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Human label, taken from the schema `title` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldSchema {
    /// Label shown to humans, falling back to the description and then the field name.
    pub fn display_label(&self, field_name: &str) -> String {
        self.label
            .clone()
            .or_else(|| self.description.clone())
            .unwrap_or_else(|| field_name.to_string())
    }
}

/// JSON request body contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RequestBodySchema {
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Names of body fields the document marks as required.
    #[serde(default)]
    pub required: Vec<String>,
    /// Declared properties in authoring order.
    #[serde(default)]
    pub properties: IndexMap<String, FieldSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

fn default_content_type() -> String {
    "application/json".to_string()
}

/// One documented response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub status: String,
    #[serde(default)]
    pub description: String,
}

/// Identity of an operation in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub path: String,
    pub method: HttpMethod,
}

impl OperationKey {
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A single `(path, method)` operation from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    /// Path template such as `/api/students/{id}`.
    pub path: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Business categories this operation belongs to.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<CatalogParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodySchema>,
    #[serde(default)]
    pub responses: Vec<ResponseDescriptor>,
    #[serde(default)]
    pub requires_auth: bool,
}

impl CatalogEntry {
    pub fn key(&self) -> OperationKey {
        OperationKey::new(self.path.clone(), self.method)
    }

    pub fn is_mutating(&self) -> bool {
        self.method.is_mutating()
    }

    pub fn path_parameters(&self) -> impl Iterator<Item = &CatalogParameter> {
        self.parameters
            .iter()
            .filter(|parameter| parameter.location == ParameterLocation::Path)
    }

    pub fn query_parameters(&self) -> impl Iterator<Item = &CatalogParameter> {
        self.parameters
            .iter()
            .filter(|parameter| parameter.location == ParameterLocation::Query)
    }

    /// Required request body field names, empty when the operation has no body.
    pub fn required_body_fields(&self) -> &[String] {
        self.request_body
            .as_ref()
            .map(|body| body.required.as_slice())
            .unwrap_or_default()
    }

    pub fn has_tag(&self, category: &str) -> bool {
        self.tags.iter().any(|tag| tag.eq_ignore_ascii_case(category))
    }
}
