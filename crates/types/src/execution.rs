//! Guarded execution request and outcome shapes.
//!
//! [`ExecutionOutcome`] serializes with a `status` tag so the calling agent can
//! branch on `missing_required_fields`, `wait_for_confirmation`, `success` or
//! `error` without inspecting anything else.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::{HttpMethod, OperationType};
use crate::discovery::CatalogMiss;

/// Arguments of `execute_operation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteOperationRequest {
    /// Path template or concrete path.
    pub endpoint: String,
    pub method: HttpMethod,
    /// Path placeholder values and query string arguments.
    #[serde(default)]
    pub query: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Set only after a human approved this exact payload.
    #[serde(default)]
    pub confirmed: bool,
}

impl ExecuteOperationRequest {
    pub fn new(endpoint: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            query: Map::new(),
            body: None,
            confirmed: false,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: Value) -> Self {
        self.query.insert(key.into(), value);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.confirmed = true;
        self
    }
}

/// Which mutating verbs must be confirmed by a human before they run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationPolicy {
    /// POST, PUT, PATCH and DELETE.
    #[default]
    AllMutating,
    /// PUT, PATCH and DELETE only; creates run without a pause.
    DestructiveOnly,
}

impl ConfirmationPolicy {
    pub fn requires_confirmation(&self, method: HttpMethod) -> bool {
        match self {
            ConfirmationPolicy::AllMutating => method.is_mutating(),
            ConfirmationPolicy::DestructiveOnly => method.is_destructive(),
        }
    }
}

/// Where a missing value has to be supplied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldLocation {
    Path,
    Query,
    Body,
}

/// A required value the caller did not provide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissingField {
    pub name: String,
    pub label: String,
    pub r#type: String,
    pub location: FieldLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    /// Input hint such as `YYYY-MM-DD` for date fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// Result of one `execute_operation` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Required values are absent; nothing was sent.
    MissingRequiredFields {
        /// Business entity the operation acts on, derived from its category.
        entity: String,
        endpoint: String,
        method: HttpMethod,
        missing_fields: Vec<MissingField>,
        /// Copy-and-fill body with every declared field.
        template: Value,
        /// Fully worked example body.
        example: Value,
        message: String,
    },
    /// Mutating call held until a human approves the echoed payload.
    WaitForConfirmation {
        operation_type: OperationType,
        endpoint: String,
        method: HttpMethod,
        query: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
        confirmation_prompt: String,
        /// The exact arguments to resend once approved.
        confirm_request: ExecuteOperationRequest,
    },
    Success {
        endpoint: String,
        method: HttpMethod,
        status_code: u16,
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error {
        endpoint: String,
        method: HttpMethod,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        /// Upstream payload or transport message, unmodified.
        error: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        catalog_miss: Option<CatalogMiss>,
    },
}

impl ExecutionOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            ExecutionOutcome::MissingRequiredFields { .. } => "missing_required_fields",
            ExecutionOutcome::WaitForConfirmation { .. } => "wait_for_confirmation",
            ExecutionOutcome::Success { .. } => "success",
            ExecutionOutcome::Error { .. } => "error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }
}
