//! The activity workflow: draft a plan, stop for human approval, then create
//! the activity and its promotional assets.

pub mod delegate;
pub mod markdown;
pub mod proposal;
pub mod runner;

pub use delegate::{DelegateError, TransportWorkflowDelegate, WorkflowDelegate};
pub use markdown::{render_completion_markdown, render_proposal_markdown};
pub use proposal::{ActivityDetails, detect_activity_type, draft_proposal, extract_details};
pub use runner::{WORKFLOW_NAME, WorkflowRunner};
