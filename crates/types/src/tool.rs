//! Generic tool invocation envelope and per-tool argument shapes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::catalog::HttpMethod;
use crate::planning::{TaskPriority, TodoStatus, TodoTaskDraft};

/// A tool call as emitted by the agent runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: ToolName, arguments: Value) -> Self {
        Self {
            name: name.as_str().to_string(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    ResolveCategories,
    ListEndpoints,
    GetOperationDetail,
    ExecuteOperation,
    AnalyzeTaskComplexity,
    CreateTodoList,
    UpdateTodoTask,
    GetTodoList,
    DeleteTodoList,
    ExecuteActivityWorkflow,
}

impl ToolName {
    pub const ALL: [ToolName; 10] = [
        ToolName::ResolveCategories,
        ToolName::ListEndpoints,
        ToolName::GetOperationDetail,
        ToolName::ExecuteOperation,
        ToolName::AnalyzeTaskComplexity,
        ToolName::CreateTodoList,
        ToolName::UpdateTodoTask,
        ToolName::GetTodoList,
        ToolName::DeleteTodoList,
        ToolName::ExecuteActivityWorkflow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ResolveCategories => "resolve_categories",
            ToolName::ListEndpoints => "list_endpoints",
            ToolName::GetOperationDetail => "get_operation_detail",
            ToolName::ExecuteOperation => "execute_operation",
            ToolName::AnalyzeTaskComplexity => "analyze_task_complexity",
            ToolName::CreateTodoList => "create_todo_list",
            ToolName::UpdateTodoTask => "update_todo_task",
            ToolName::GetTodoList => "get_todo_list",
            ToolName::DeleteTodoList => "delete_todo_list",
            ToolName::ExecuteActivityWorkflow => "execute_activity_workflow",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tool '{0}'")]
pub struct UnknownToolError(pub String);

impl FromStr for ToolName {
    type Err = UnknownToolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == value.trim())
            .ok_or_else(|| UnknownToolError(value.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ResolveCategoriesArgs {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListEndpointsArgs {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationDetailArgs {
    pub endpoint: String,
    pub method: HttpMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyzeComplexityArgs {
    pub user_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTodoListArgs {
    pub title: String,
    /// Request text used to derive tasks when `tasks` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TodoTaskDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateTodoTaskArgs {
    pub list_id: String,
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TodoStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Names one todo list for `get_todo_list` and `delete_todo_list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoListArgs {
    pub list_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip_through_strings() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
        }
        assert!("click_element".parse::<ToolName>().is_err());
    }
}
