//! Result shapes for the discovery chain: categories, endpoint listings and
//! operation details. Every result carries a `next_action` so the calling agent
//! continues the chain without asking a human.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogParameter, HttpMethod, RequestBodySchema, ResponseDescriptor};

/// What the agent should do with a discovery result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    /// Pick the first category and call `list_endpoints`.
    AutoSelectTopMatch,
    /// Pick an endpoint and call `get_operation_detail`.
    InspectOperation,
    /// Call `execute_operation` with the resolved contract.
    ExecuteOperation,
    /// Discovery missed; call `resolve_categories` again.
    RerunCategoryResolver,
    /// Path or method missed; call `list_endpoints` again.
    RerunEndpointLister,
}

/// Short reference to an operation, used for examples and listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationPreview {
    pub path: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub summary: String,
}

/// One ranked category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryMatch {
    pub name: String,
    pub score: u32,
    pub operation_count: usize,
    /// Expanded search terms that contributed to the score.
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    /// Up to three sample operations.
    #[serde(default)]
    pub examples: Vec<OperationPreview>,
}

/// Output of the category resolver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryResolution {
    pub keywords: Vec<String>,
    /// Keywords after normalization and synonym expansion, in first-seen order.
    pub expanded_terms: Vec<String>,
    pub categories: Vec<CategoryMatch>,
    /// True when nothing matched and the largest categories were returned instead.
    pub fallback: bool,
    pub next_action: NextAction,
    pub instruction: String,
}

impl CategoryResolution {
    pub fn top_category(&self) -> Option<&CategoryMatch> {
        self.categories.first()
    }
}

/// One endpoint inside a category listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointSummary {
    pub path: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Mutating operations go through the confirmation gate.
    pub requires_confirmation: bool,
}

/// Output of the endpoint lister.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointListing {
    pub category: String,
    pub total: usize,
    pub endpoints: Vec<EndpointSummary>,
    /// Endpoints keyed by method name, in GET, POST, PUT, PATCH, DELETE order.
    pub grouped_by_method: IndexMap<String, Vec<EndpointSummary>>,
    pub next_action: NextAction,
    pub instruction: String,
}

/// Why a catalog lookup failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CatalogMissKind {
    UnknownCategory,
    UnknownPath,
    MethodNotAvailable,
}

/// Structured lookup miss. Returned as data so the agent can correct itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogMiss {
    pub kind: CatalogMissKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    /// Methods that do exist for the requested path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_methods: Vec<HttpMethod>,
    pub next_action: NextAction,
    pub instruction: String,
}

/// Full contract of one operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationDetail {
    /// Catalog path template.
    pub path: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub parameters: Vec<CatalogParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodySchema>,
    pub responses: Vec<ResponseDescriptor>,
    pub requires_auth: bool,
    pub requires_confirmation: bool,
    /// Human-readable rendering of the contract.
    pub rendered_summary: String,
    pub next_action: NextAction,
    pub instruction: String,
}
