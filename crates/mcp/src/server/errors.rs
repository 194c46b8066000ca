//! Structured tool error helpers.
//!
//! Every `ErrorData` carries a payload with `error_code`, `category`,
//! `retryable` and `suggested_action` so the agent can decide its next call.

use std::fmt::Display;

use chrono::Utc;
use rmcp::model::ErrorData;
use serde_json::{Value, json};
use tollgate_engine::{DispatchError, TodoError};

fn build_error_data(
    error_code: &str,
    category: &str,
    message: &str,
    context: Value,
    retryable: bool,
    suggested_action: &str,
) -> Value {
    json!({
        "error_code": error_code,
        "category": category,
        "message": message,
        "context": context,
        "retryable": retryable,
        "suggested_action": suggested_action,
        "correlation_id": format!("tollgate-{}", Utc::now().timestamp_millis()),
    })
}

pub fn invalid_params_error(error_code: &str, message: impl Into<String>, context: Value, suggested_action: &str) -> ErrorData {
    let message = message.into();
    let data = build_error_data(error_code, "validation", &message, context, false, suggested_action);
    ErrorData::invalid_params(message, Some(data))
}

pub fn not_found_error(error_code: &str, message: impl Into<String>, context: Value, suggested_action: &str) -> ErrorData {
    let message = message.into();
    let data = build_error_data(error_code, "not_found", &message, context, false, suggested_action);
    ErrorData::resource_not_found(message, Some(data))
}

pub fn conflict_error(error_code: &str, message: impl Into<String>, context: Value, suggested_action: &str) -> ErrorData {
    let message = message.into();
    let data = build_error_data(error_code, "conflict", &message, context, false, suggested_action);
    ErrorData::invalid_request(message, Some(data))
}

pub fn internal_error(error_code: &str, message: impl Into<String>, context: Value, suggested_action: &str) -> ErrorData {
    let message = message.into();
    let data = build_error_data(error_code, "internal", &message, context, false, suggested_action);
    ErrorData::internal_error(message, Some(data))
}

/// The server cannot serve discovery or execution at all.
pub fn configuration_error(error: &impl Display) -> ErrorData {
    let message = error.to_string();
    let data = build_error_data(
        "CONFIGURATION_FAILURE",
        "configuration",
        &message,
        Value::Null,
        false,
        "Tell the user the API catalog is unavailable; an operator must fix the catalog source in the Tollgate configuration.",
    );
    ErrorData::internal_error(message, Some(data))
}

pub fn todo_error(error: &TodoError) -> ErrorData {
    let message = error.to_string();
    match error {
        TodoError::ListNotFound(list_id) => not_found_error(
            "TODO_LIST_NOT_FOUND",
            message,
            json!({ "list_id": list_id }),
            "Use the list id returned by create_todo_list, or create a new list.",
        ),
        TodoError::TaskNotFound { list_id, task_id } => not_found_error(
            "TODO_TASK_NOT_FOUND",
            message,
            json!({ "list_id": list_id, "task_id": task_id }),
            "Use a task id from the list returned by create_todo_list.",
        ),
        TodoError::TaskFinished { task_id, status } => conflict_error(
            "TODO_TASK_FINISHED",
            message,
            json!({ "task_id": task_id, "status": status }),
            "Move on to the next pending task; finished tasks cannot change.",
        ),
        TodoError::ProgressOutOfRange(progress) => invalid_params_error(
            "TODO_PROGRESS_OUT_OF_RANGE",
            message,
            json!({ "progress": progress }),
            "Report progress as a percentage between 0 and 100.",
        ),
        TodoError::NoTasks => invalid_params_error(
            "TODO_LIST_EMPTY",
            message,
            Value::Null,
            "Pass explicit tasks or the user's request as user_input.",
        ),
    }
}

pub fn dispatch_error(error: &DispatchError) -> ErrorData {
    match error {
        DispatchError::Configuration(error) => configuration_error(error),
        DispatchError::Catalog(error) => configuration_error(error),
        DispatchError::Todo(error) => todo_error(error),
        DispatchError::UnknownTool(_) | DispatchError::InvalidArguments { .. } => invalid_params_error(
            "INVALID_TOOL_CALL",
            error.to_string(),
            Value::Null,
            "Check the tool name and its argument schema.",
        ),
        DispatchError::Serialization(_) => internal_error(
            "SERIALIZATION_FAILED",
            error.to_string(),
            Value::Null,
            "Retry the call; report the failure if it persists.",
        ),
    }
}
