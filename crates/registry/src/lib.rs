//! Catalog index and discovery chain.
//!
//! This crate loads an OpenAPI catalog into a read-only [`CatalogIndex`] and
//! implements the three discovery steps an agent walks before executing
//! anything: category resolution, endpoint listing and operation detail.

pub mod config;
pub mod detail;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod openapi_import;
pub mod search;
pub mod synonyms;

pub use config::{TollgateConfig, WorkflowSettings, default_config_path};
pub use detail::{get_operation_detail, operation_miss, render_operation_summary};
pub use endpoints::list_endpoints;
pub use error::CatalogError;
pub use models::{CatalogIndex, EMBEDDED_CATALOG, ResolvedOperation};
pub use openapi_import::{import_openapi_catalog, parse_openapi_document_value};
pub use search::{CategoryResolver, DEFAULT_CATEGORY_LIMIT};
pub use synonyms::{SynonymGroup, SynonymTable};
