use thiserror::Error;
use tollgate_registry::CatalogError;
use tollgate_types::{ToolName, UnknownToolError};

use crate::planner::TodoError;

/// Failures that leave the orchestration core unable to serve any request.
///
/// Everything an agent can recover from (catalog misses, missing fields,
/// pending confirmations, upstream errors) is returned as data instead.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("the catalog has no operations; check the configured catalog source")]
    EmptyCatalog,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Failures of a generic `{name, arguments}` tool call.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    UnknownTool(#[from] UnknownToolError),
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: ToolName, message: String },
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Todo(#[from] TodoError),
    #[error("failed to serialize tool result: {0}")]
    Serialization(#[from] serde_json::Error),
}
