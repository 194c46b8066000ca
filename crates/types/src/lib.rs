//! Shared data model for the Tollgate orchestration core.
//!
//! Every type here is plain serde data exchanged between the registry, the
//! engine, the MCP server and the CLI. Behavior lives in those crates.

pub mod catalog;
pub mod discovery;
pub mod execution;
pub mod planning;
pub mod tool;
pub mod workflow;

pub use catalog::{
    CatalogEntry, CatalogParameter, FieldSchema, HttpMethod, OperationKey, OperationType, ParameterLocation,
    ParseHttpMethodError, RequestBodySchema, ResponseDescriptor,
};
pub use discovery::{
    CatalogMiss, CatalogMissKind, CategoryMatch, CategoryResolution, EndpointListing, EndpointSummary, NextAction,
    OperationDetail, OperationPreview,
};
pub use execution::{ConfirmationPolicy, ExecuteOperationRequest, ExecutionOutcome, FieldLocation, MissingField};
pub use planning::{
    ComplexityAssessment, ComplexityLevel, ExecutionStrategy, MatchedSignal, SignalKind, TaskPriority, TodoList,
    TodoStatus, TodoSummary, TodoTask, TodoTaskDraft,
};
pub use tool::{
    AnalyzeComplexityArgs, CreateTodoListArgs, ListEndpointsArgs, OperationDetailArgs, ResolveCategoriesArgs, ToolCall,
    TodoListArgs, ToolName, UnknownToolError, UpdateTodoTaskArgs,
};
pub use workflow::{
    ActivityProposal, ActivityType, ExecuteWorkflowRequest, GeneratedAsset, ScheduleItem, WorkflowArtifacts,
    WorkflowEvent, WorkflowOutcome, WorkflowPhase, WorkflowStep, WorkflowStepStatus,
};
