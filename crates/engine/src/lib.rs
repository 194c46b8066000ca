//! # Tollgate Engine
//!
//! Everything that acts on a resolved catalog operation:
//!
//! - **`executor`**: required-field validation, the stateless confirmation
//!   gate and single-shot dispatch through a [`Transport`].
//! - **`planner`**: advisory complexity scoring and in-memory todo lists for
//!   compound requests.
//! - **`workflow`**: the eight-phase activity workflow with its mandatory
//!   confirmation pause.
//! - **`dispatcher`**: generic `{name, arguments}` routing over all of the above.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use serde_json::json;
//! use tollgate_api::ApiClient;
//! use tollgate_engine::{HttpTransport, ToolDispatcher};
//! use tollgate_registry::{CatalogIndex, TollgateConfig};
//! use tollgate_types::{ToolCall, ToolName};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = TollgateConfig::default();
//! let catalog = Arc::new(CatalogIndex::from_embedded()?);
//! let transport = Arc::new(HttpTransport::new(ApiClient::from_env(None, Duration::from_secs(30))?));
//! let dispatcher = ToolDispatcher::from_config(&config, catalog, transport, None);
//!
//! let call = ToolCall::new(ToolName::ResolveCategories, json!({"keywords": ["班级"]}));
//! println!("{}", dispatcher.dispatch(&call).await?);
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod planner;
pub mod workflow;

pub use dispatcher::ToolDispatcher;
pub use error::{ConfigurationError, DispatchError};
pub use executor::{GuardedExecutor, HttpTransport, Transport, TransportError, TransportRequest, TransportResponse};
pub use planner::{TodoBoard, TodoError, analyze_complexity, create_todo_list, decompose_intent, update_task};
pub use workflow::{
    DelegateError, TransportWorkflowDelegate, WORKFLOW_NAME, WorkflowDelegate, WorkflowRunner, draft_proposal,
    render_completion_markdown, render_proposal_markdown,
};
