use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tollgate_types::{
    ActivityProposal, AnalyzeComplexityArgs, CreateTodoListArgs, ExecuteOperationRequest, ExecuteWorkflowRequest,
    HttpMethod, ListEndpointsArgs, OperationDetailArgs, ResolveCategoriesArgs, TaskPriority, TodoListArgs,
    TodoTaskDraft, UpdateTodoTaskArgs,
};

/// Parameters for category resolution.
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolveCategoriesParam {
    #[schemars(description = "Keywords taken from the user's request, e.g. [\"查询\", \"班级\"]. May be empty to browse.")]
    #[serde(default)]
    pub keywords: Vec<String>,
    #[schemars(description = "Maximum number of categories to return. Defaults to 5.")]
    pub limit: Option<usize>,
}

impl ResolveCategoriesParam {
    pub fn into_args(self) -> ResolveCategoriesArgs {
        ResolveCategoriesArgs {
            keywords: self.keywords,
            limit: self.limit,
        }
    }
}

#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ListEndpointsParam {
    #[schemars(description = "Category name exactly as returned by resolve_categories.")]
    pub category: String,
    #[schemars(description = "Optional HTTP method filter: GET, POST, PUT, PATCH or DELETE.")]
    pub method: Option<String>,
}

impl ListEndpointsParam {
    pub fn into_args(self) -> Result<ListEndpointsArgs, String> {
        Ok(ListEndpointsArgs {
            category: self.category,
            method: self.method.as_deref().map(parse_method).transpose()?,
        })
    }
}

#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OperationDetailParam {
    #[schemars(description = "Endpoint path from list_endpoints; a concrete path such as /api/students/7 also resolves.")]
    pub endpoint: String,
    #[schemars(description = "HTTP method of the operation.")]
    pub method: String,
}

impl OperationDetailParam {
    pub fn into_args(self) -> Result<OperationDetailArgs, String> {
        Ok(OperationDetailArgs {
            method: parse_method(&self.method)?,
            endpoint: self.endpoint,
        })
    }
}

#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecuteOperationParam {
    #[schemars(description = "Endpoint path template or concrete path.")]
    pub endpoint: String,
    #[schemars(description = "HTTP method of the operation.")]
    pub method: String,
    #[schemars(description = "Path placeholder values and query string arguments, e.g. {\"id\": 7}.")]
    pub query: Option<Map<String, Value>>,
    #[schemars(description = "JSON request body for POST, PUT and PATCH operations.")]
    pub body: Option<Value>,
    #[schemars(
        description = "Set to true only after the user approved this exact payload. Resend confirm_request from wait_for_confirmation unchanged."
    )]
    pub confirmed: Option<bool>,
}

impl ExecuteOperationParam {
    pub fn into_request(self) -> Result<ExecuteOperationRequest, String> {
        Ok(ExecuteOperationRequest {
            method: parse_method(&self.method)?,
            endpoint: self.endpoint,
            query: self.query.unwrap_or_default(),
            body: self.body,
            confirmed: self.confirmed.unwrap_or(false),
        })
    }
}

#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeComplexityParam {
    #[schemars(description = "The user's request, verbatim.")]
    pub user_input: String,
    #[schemars(description = "Optional recent conversation context.")]
    pub context: Option<String>,
}

impl AnalyzeComplexityParam {
    pub fn into_args(self) -> AnalyzeComplexityArgs {
        AnalyzeComplexityArgs {
            user_input: self.user_input,
            context: self.context,
        }
    }
}

#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TodoTaskParam {
    pub title: String,
    pub description: Option<String>,
    #[schemars(description = "high, medium or low. Defaults to medium.")]
    pub priority: Option<String>,
}

#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateTodoListParam {
    #[schemars(description = "Short title for the plan.")]
    pub title: String,
    #[schemars(description = "Request text to split into tasks when no tasks are given.")]
    pub user_input: Option<String>,
    #[schemars(description = "Explicit tasks in execution order.")]
    pub tasks: Option<Vec<TodoTaskParam>>,
}

impl CreateTodoListParam {
    pub fn into_args(self) -> Result<CreateTodoListArgs, String> {
        let tasks = self
            .tasks
            .unwrap_or_default()
            .into_iter()
            .map(|task| {
                Ok(TodoTaskDraft {
                    title: task.title,
                    description: task.description,
                    priority: match task.priority.as_deref() {
                        Some(priority) => parse_enum::<TaskPriority>("priority", priority)?,
                        None => TaskPriority::default(),
                    },
                })
            })
            .collect::<Result<Vec<_>, String>>()?;
        Ok(CreateTodoListArgs {
            title: self.title,
            user_input: self.user_input,
            tasks,
        })
    }
}

#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UpdateTodoTaskParam {
    pub list_id: String,
    pub task_id: String,
    #[schemars(description = "pending, in_progress, completed, failed or cancelled.")]
    pub status: Option<String>,
    #[schemars(description = "Progress percentage, 0 to 100.")]
    pub progress: Option<u8>,
    #[schemars(description = "high, medium or low.")]
    pub priority: Option<String>,
    #[schemars(description = "Result payload to attach, typically the execute_operation data.")]
    pub result: Option<Value>,
}

impl UpdateTodoTaskParam {
    pub fn into_args(self) -> Result<UpdateTodoTaskArgs, String> {
        Ok(UpdateTodoTaskArgs {
            status: self.status.as_deref().map(|status| parse_enum("status", status)).transpose()?,
            priority: self
                .priority
                .as_deref()
                .map(|priority| parse_enum("priority", priority))
                .transpose()?,
            list_id: self.list_id,
            task_id: self.task_id,
            progress: self.progress,
            result: self.result,
        })
    }
}

#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TodoListParam {
    #[schemars(description = "The list id returned by create_todo_list.")]
    pub list_id: String,
}

impl TodoListParam {
    pub fn into_args(self) -> TodoListArgs {
        TodoListArgs { list_id: self.list_id }
    }
}

#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActivityWorkflowParam {
    #[schemars(description = "The user's activity request, verbatim.")]
    pub user_input: String,
    #[schemars(description = "True only when resending confirm_request after the user approved the proposal.")]
    pub confirmed: Option<bool>,
    #[schemars(description = "The proposal returned by the first call, echoed back unchanged.")]
    pub proposal: Option<Value>,
}

impl ActivityWorkflowParam {
    pub fn into_request(self) -> Result<ExecuteWorkflowRequest, String> {
        let proposal = self
            .proposal
            .filter(|proposal| !proposal.is_null())
            .map(serde_json::from_value::<ActivityProposal>)
            .transpose()
            .map_err(|error| format!("proposal is not a valid activity proposal: {error}"))?;
        Ok(ExecuteWorkflowRequest {
            user_input: self.user_input,
            confirmed: self.confirmed.unwrap_or(false),
            proposal,
        })
    }
}

fn parse_method(method: &str) -> Result<HttpMethod, String> {
    method.parse::<HttpMethod>().map_err(|error| error.to_string())
}

fn parse_enum<T: DeserializeOwned>(field: &str, value: &str) -> Result<T, String> {
    serde_json::from_value(Value::String(value.trim().to_lowercase()))
        .map_err(|_| format!("'{value}' is not a valid {field}"))
}
