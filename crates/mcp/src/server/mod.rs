mod core;
mod errors;
mod http;
mod log_payload;
mod schemas;

pub use core::TollgateMcpCore;
pub use http::{DEFAULT_BIND_ADDRESS, McpHttpLogEntry, McpHttpServer, RunningMcpHttpServer, resolve_bind_address};
pub use schemas::{
    ActivityWorkflowParam, AnalyzeComplexityParam, CreateTodoListParam, ExecuteOperationParam, ListEndpointsParam,
    OperationDetailParam, ResolveCategoriesParam, TodoListParam, TodoTaskParam, UpdateTodoTaskParam,
};
