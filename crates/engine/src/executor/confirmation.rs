use std::fmt::Write as _;

use serde_json::Value;
use tollgate_types::{CatalogEntry, ExecuteOperationRequest, ExecutionOutcome, OperationType};

/// Holds a mutating call until a human approves the echoed payload.
///
/// `confirm_request` is the caller's request with `confirmed = true` and,
/// for verbs without a body, the body dropped, so the echo matches what the
/// approved call sends.
pub fn confirmation_outcome(entry: &CatalogEntry, request: &ExecuteOperationRequest) -> ExecutionOutcome {
    let operation_type = entry.method.operation_type();
    let mut confirm_request = request.clone();
    confirm_request.confirmed = true;
    if !entry.method.carries_body() {
        confirm_request.body = None;
    }

    ExecutionOutcome::WaitForConfirmation {
        operation_type,
        endpoint: request.endpoint.clone(),
        method: request.method,
        query: request.query.clone(),
        body: confirm_request.body.clone(),
        confirmation_prompt: confirmation_prompt(entry, &confirm_request, operation_type),
        confirm_request,
    }
}

fn confirmation_prompt(entry: &CatalogEntry, request: &ExecuteOperationRequest, operation_type: OperationType) -> String {
    let mut prompt = String::new();
    let action = if entry.summary.is_empty() {
        format!("{} {}", operation_type.verb(), entry.path)
    } else {
        entry.summary.clone()
    };
    let _ = writeln!(prompt, "Please confirm: {} ({} {}).", action, request.method, request.endpoint);
    if !request.query.is_empty() {
        let _ = writeln!(prompt, "Parameters: {}", Value::Object(request.query.clone()));
    }
    if let Some(body) = &request.body {
        let _ = writeln!(prompt, "Data: {}", body);
    }
    match operation_type {
        OperationType::Delete => {
            let _ = writeln!(prompt, "This permanently deletes the record and cannot be undone.");
        }
        OperationType::Update => {
            let _ = writeln!(prompt, "This overwrites the stored values.");
        }
        OperationType::Create | OperationType::Read => {}
    }
    if matches!(operation_type, OperationType::Update | OperationType::Delete) {
        let _ = writeln!(
            prompt,
            "If the record was named rather than identified, look it up with a GET call first and confirm the id."
        );
    }
    let _ = write!(prompt, "After the user approves, resend confirm_request unchanged.");
    prompt
}
