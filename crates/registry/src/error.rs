use thiserror::Error;
use tollgate_util::OpenApiValidationViolation;

/// Failures that leave the orchestration core without a usable catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Source was not valid JSON or YAML.
    #[error("catalog source is not valid JSON or YAML: {0}")]
    SourceParse(String),
    /// Source failed preflight validation.
    #[error("catalog source failed OpenAPI preflight validation ({} violation(s))", .0.len())]
    PreflightValidation(Vec<OpenApiValidationViolation>),
    #[error("failed to read catalog source '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch catalog source '{url}': {message}")]
    Fetch { url: String, message: String },
    /// The catalog holds no operations, so discovery cannot proceed.
    #[error("catalog contains no operations")]
    Empty,
}
