pub mod http_path_resolution;
pub mod openapi_validation;
pub mod path_processing;
pub mod text_processing;

pub use http_path_resolution::{build_path, match_path_template, placeholder_names, unresolved_placeholders};
pub use openapi_validation::{
    OpenApiValidationViolation, collect_openapi_preflight_violations, validate_openapi_preflight,
};
pub use path_processing::{expand_tilde, is_remote_source};
pub use text_processing::{char_length, normalize_keyword, redact_sensitive, redact_sensitive_with, truncate_chars};
