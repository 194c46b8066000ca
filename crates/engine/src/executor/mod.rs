//! Guarded execution of catalog operations.
//!
//! Every call walks the same states: validate, then stop with missing fields,
//! stop for confirmation, or execute exactly once. Only a caller-supplied
//! `confirmed = true` moves a mutating call past the confirmation gate, and
//! only for that call.

pub mod confirmation;
pub mod prepare;
pub mod response;
pub mod template;
pub mod transport;
pub mod validation;

use std::sync::Arc;

use serde_json::json;
use tollgate_registry::{CatalogIndex, operation_miss};
use tollgate_types::{
    CatalogEntry, ConfirmationPolicy, ExecuteOperationRequest, ExecutionOutcome, MissingField,
};
use tracing::{info, warn};

pub use confirmation::confirmation_outcome;
pub use prepare::{collect_path_values, prepare_request};
pub use response::unwrap_envelope;
pub use template::{fill_in_template, worked_example};
pub use transport::{HttpTransport, Transport, TransportError, TransportRequest, TransportResponse};
pub use validation::missing_required_fields;

use crate::error::ConfigurationError;

/// Runs `execute_operation` calls against the catalog through a [`Transport`].
#[derive(Clone)]
pub struct GuardedExecutor {
    catalog: Arc<CatalogIndex>,
    transport: Arc<dyn Transport>,
    policy: ConfirmationPolicy,
    bearer_token: Option<String>,
}

impl GuardedExecutor {
    pub fn new(catalog: Arc<CatalogIndex>, transport: Arc<dyn Transport>) -> Self {
        Self {
            catalog,
            transport,
            policy: ConfirmationPolicy::default(),
            bearer_token: None,
        }
    }

    pub fn with_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Credential attached as `Authorization: Bearer` to every dispatched call.
    pub fn with_bearer_token(mut self, bearer_token: Option<String>) -> Self {
        self.bearer_token = bearer_token.filter(|token| !token.trim().is_empty());
        self
    }

    pub fn policy(&self) -> ConfirmationPolicy {
        self.policy
    }

    /// Validates, gates and (at most once) dispatches one operation.
    ///
    /// Recoverable conditions come back as [`ExecutionOutcome`] variants; the
    /// only `Err` is an unusable catalog.
    pub async fn execute(&self, request: ExecuteOperationRequest) -> Result<ExecutionOutcome, ConfigurationError> {
        if self.catalog.is_empty() {
            return Err(ConfigurationError::EmptyCatalog);
        }

        let Some(resolved) = self.catalog.resolve(&request.endpoint, request.method) else {
            let miss = operation_miss(&self.catalog, &request.endpoint, request.method);
            info!(endpoint = %request.endpoint, method = %request.method, kind = ?miss.kind, "operation not in catalog");
            return Ok(ExecutionOutcome::Error {
                endpoint: request.endpoint,
                method: request.method,
                status_code: None,
                error: json!({ "message": miss.message }),
                catalog_miss: Some(miss),
            });
        };
        let entry = resolved.entry;
        let path_values = collect_path_values(entry, &resolved.path_values, &request.query);

        let missing = missing_required_fields(entry, &path_values, &request.query, request.body.as_ref());
        if !missing.is_empty() {
            info!(
                operation = %entry.key(),
                missing = missing.len(),
                "operation held for missing required fields"
            );
            return Ok(missing_fields_outcome(entry, &request, missing));
        }

        if self.policy.requires_confirmation(entry.method) && !request.confirmed {
            info!(operation = %entry.key(), "operation awaiting confirmation");
            return Ok(confirmation_outcome(entry, &request));
        }

        let transport_request = prepare_request(entry, &request, &path_values, self.bearer_token.as_deref());
        info!(
            operation = %entry.key(),
            path = %transport_request.path,
            confirmed = request.confirmed,
            "executing operation"
        );
        let outcome = match self.transport.send(transport_request).await {
            Ok(response) => interpret_response(&request, response),
            Err(error) => {
                warn!(operation = %entry.key(), %error, "operation transport failed");
                ExecutionOutcome::Error {
                    endpoint: request.endpoint.clone(),
                    method: request.method,
                    status_code: None,
                    error: json!({ "message": error.to_string() }),
                    catalog_miss: None,
                }
            }
        };
        info!(operation = %entry.key(), status = outcome.status(), "operation finished");
        Ok(outcome)
    }
}

fn interpret_response(request: &ExecuteOperationRequest, response: TransportResponse) -> ExecutionOutcome {
    let status_code = response.status;
    if !response.is_success() {
        return ExecutionOutcome::Error {
            endpoint: request.endpoint.clone(),
            method: request.method,
            status_code: Some(status_code),
            error: response.body,
            catalog_miss: None,
        };
    }
    match unwrap_envelope(response.body) {
        Ok((data, message)) => ExecutionOutcome::Success {
            endpoint: request.endpoint.clone(),
            method: request.method,
            status_code,
            data,
            message,
        },
        Err(payload) => ExecutionOutcome::Error {
            endpoint: request.endpoint.clone(),
            method: request.method,
            status_code: Some(status_code),
            error: payload,
            catalog_miss: None,
        },
    }
}

fn missing_fields_outcome(
    entry: &CatalogEntry,
    request: &ExecuteOperationRequest,
    missing_fields: Vec<MissingField>,
) -> ExecutionOutcome {
    let listed = missing_fields
        .iter()
        .map(|field| {
            if field.label == field.name {
                field.name.clone()
            } else {
                format!("{} ({})", field.label, field.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    ExecutionOutcome::MissingRequiredFields {
        entity: entity_name(entry),
        endpoint: request.endpoint.clone(),
        method: request.method,
        template: fill_in_template(entry),
        example: worked_example(entry),
        message: format!(
            "{} {} needs: {}. Ask the user for these values; do not invent them.",
            request.method, request.endpoint, listed
        ),
        missing_fields,
    }
}

/// Business entity named by the first category, e.g. `学生管理` becomes `学生`.
fn entity_name(entry: &CatalogEntry) -> String {
    if let Some(tag) = entry.tags.first() {
        let trimmed = tag.trim_end_matches("管理").trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    entry
        .path
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty() && !segment.starts_with('{'))
        .unwrap_or(entry.path.as_str())
        .to_string()
}

impl std::fmt::Debug for GuardedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedExecutor")
            .field("operations", &self.catalog.len())
            .field("policy", &self.policy)
            .field("authenticated", &self.bearer_token.is_some())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;
    use tollgate_types::HttpMethod;

    use super::*;

    /// Records every request and answers from a fixed queue (200 `{}` once empty).
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub requests: Mutex<Vec<TransportRequest>>,
        pub responses: Mutex<Vec<Result<TransportResponse, TransportError>>>,
    }

    impl RecordingTransport {
        pub fn answering(responses: Vec<Result<TransportResponse, TransportError>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses),
            }
        }

        pub fn sent(&self) -> Vec<TransportRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok(TransportResponse {
                    status: 200,
                    body: json!({}),
                });
            }
            responses.remove(0)
        }
    }

    fn executor(transport: Arc<RecordingTransport>) -> GuardedExecutor {
        GuardedExecutor::new(Arc::new(CatalogIndex::from_embedded().unwrap()), transport)
            .with_bearer_token(Some("secret-token".to_string()))
    }

    fn ok(body: Value) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse { status: 200, body })
    }

    #[tokio::test]
    async fn read_executes_immediately_and_unwraps_envelope() {
        let transport = Arc::new(RecordingTransport::answering(vec![ok(
            json!({"success": true, "message": "ok", "data": [{"id": 1, "name": "大一班"}]}),
        )]));
        let outcome = executor(transport.clone())
            .execute(ExecuteOperationRequest::new("/api/classes", HttpMethod::Get).with_query("grade", json!("大班")))
            .await
            .unwrap();

        let ExecutionOutcome::Success { data, status_code, .. } = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(status_code, 200);
        assert_eq!(data[0]["name"], "大一班");
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].query, vec![("grade".to_string(), "大班".to_string())]);
        assert_eq!(sent[0].bearer_token.as_deref(), Some("secret-token"));
    }

    #[tokio::test]
    async fn missing_fields_stop_before_confirmation_and_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let outcome = executor(transport.clone())
            .execute(
                ExecuteOperationRequest::new("/api/students", HttpMethod::Post)
                    .with_body(json!({"name": "小红"}))
                    .confirmed(),
            )
            .await
            .unwrap();

        let ExecutionOutcome::MissingRequiredFields {
            entity,
            missing_fields,
            template,
            example,
            message,
            ..
        } = outcome
        else {
            panic!("expected missing fields");
        };
        assert_eq!(entity, "学生");
        assert_eq!(missing_fields.len(), 3);
        assert!(template["body"].get("parentPhone").is_some());
        assert_eq!(template["body"]["name"], "");
        assert!(example["body"]["name"].as_str().is_some_and(|name| !name.is_empty()));
        assert!(message.contains("性别 (gender)"));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn unconfirmed_delete_waits_and_confirmed_delete_runs_once() {
        let transport = Arc::new(RecordingTransport::default());
        let executor = executor(transport.clone());
        let request = ExecuteOperationRequest::new("/api/students/7", HttpMethod::Delete);

        let first = executor.execute(request.clone()).await.unwrap();
        let ExecutionOutcome::WaitForConfirmation { confirm_request, .. } = first else {
            panic!("expected confirmation gate");
        };
        assert!(transport.sent().is_empty());

        let second = executor.execute(confirm_request).await.unwrap();
        assert!(second.is_success());
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].path, "/api/students/7");
        assert_eq!(sent[0].method, HttpMethod::Delete);
    }

    #[tokio::test]
    async fn reads_run_without_required_query_parameters() {
        let transport = Arc::new(RecordingTransport::default());
        let outcome = executor(transport.clone())
            .execute(ExecuteOperationRequest::new("/api/students/search", HttpMethod::Get))
            .await
            .unwrap();

        assert!(outcome.is_success());
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].path, "/api/students/search");
        assert!(sent[0].query.is_empty());
    }

    #[tokio::test]
    async fn delete_echo_matches_the_request_that_is_sent() {
        let transport = Arc::new(RecordingTransport::default());
        let executor = executor(transport.clone());
        let request =
            ExecuteOperationRequest::new("/api/students/7", HttpMethod::Delete).with_body(json!({"reason": "left"}));

        let ExecutionOutcome::WaitForConfirmation {
            body, confirm_request, ..
        } = executor.execute(request).await.unwrap()
        else {
            panic!("expected confirmation gate");
        };
        assert_eq!(body, None);
        assert_eq!(confirm_request.body, None);

        executor.execute(confirm_request).await.unwrap();
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, body);
    }

    #[tokio::test]
    async fn confirmed_update_sends_the_echoed_body() {
        let transport = Arc::new(RecordingTransport::default());
        let executor = executor(transport.clone());
        let request =
            ExecuteOperationRequest::new("/api/classes/4", HttpMethod::Put).with_body(json!({"name": "大二班", "grade": "大班"}));

        let ExecutionOutcome::WaitForConfirmation {
            body, confirm_request, ..
        } = executor.execute(request).await.unwrap()
        else {
            panic!("expected confirmation gate");
        };
        executor.execute(confirm_request).await.unwrap();
        assert_eq!(transport.sent()[0].body, body);
    }

    #[tokio::test]
    async fn destructive_only_policy_lets_creates_through() {
        let transport = Arc::new(RecordingTransport::default());
        let executor = executor(transport.clone()).with_policy(ConfirmationPolicy::DestructiveOnly);
        let outcome = executor
            .execute(ExecuteOperationRequest::new("/api/classes", HttpMethod::Post).with_body(json!({"name": "大一班", "grade": "大班"})))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(transport.sent()[0].body, Some(json!({"name": "大一班", "grade": "大班"})));
    }

    #[tokio::test]
    async fn upstream_failures_are_returned_verbatim() {
        let payload = json!({"success": false, "message": "学生不存在"});
        let transport = Arc::new(RecordingTransport::answering(vec![Ok(TransportResponse {
            status: 404,
            body: payload.clone(),
        })]));
        let outcome = executor(transport)
            .execute(ExecuteOperationRequest::new("/api/students/99", HttpMethod::Get))
            .await
            .unwrap();

        let ExecutionOutcome::Error { status_code, error, catalog_miss, .. } = outcome else {
            panic!("expected error");
        };
        assert_eq!(status_code, Some(404));
        assert_eq!(error, payload);
        assert!(catalog_miss.is_none());
    }

    #[tokio::test]
    async fn failed_envelope_on_2xx_is_an_error() {
        let transport = Arc::new(RecordingTransport::answering(vec![ok(json!({"success": false, "message": "班级已满"}))]));
        let outcome = executor(transport)
            .execute(ExecuteOperationRequest::new("/api/classes/2", HttpMethod::Get))
            .await
            .unwrap();
        assert_eq!(outcome.status(), "error");
    }

    #[tokio::test]
    async fn transport_errors_become_error_outcomes() {
        let transport = Arc::new(RecordingTransport::answering(vec![Err(TransportError::Timeout {
            path: "/api/classes".into(),
        })]));
        let outcome = executor(transport)
            .execute(ExecuteOperationRequest::new("/api/classes", HttpMethod::Get))
            .await
            .unwrap();

        let ExecutionOutcome::Error { status_code, error, .. } = outcome else {
            panic!("expected error");
        };
        assert!(status_code.is_none());
        assert!(error["message"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn unknown_operations_carry_a_catalog_hint() {
        let transport = Arc::new(RecordingTransport::default());
        let outcome = executor(transport.clone())
            .execute(ExecuteOperationRequest::new("/api/students/7", HttpMethod::Patch).confirmed())
            .await
            .unwrap();

        let ExecutionOutcome::Error { catalog_miss, .. } = outcome else {
            panic!("expected error");
        };
        let miss = catalog_miss.unwrap();
        assert_eq!(miss.available_methods, vec![HttpMethod::Get, HttpMethod::Put, HttpMethod::Delete]);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn empty_catalog_is_a_configuration_error() {
        let executor = GuardedExecutor::new(Arc::new(CatalogIndex::default()), Arc::new(RecordingTransport::default()));
        let result = executor
            .execute(ExecuteOperationRequest::new("/api/classes", HttpMethod::Get))
            .await;
        assert!(matches!(result, Err(ConfigurationError::EmptyCatalog)));
    }

    #[test]
    fn entity_comes_from_first_category() {
        let catalog = CatalogIndex::from_embedded().unwrap();
        let entry = catalog.resolve("/api/classes/3/students", HttpMethod::Get).unwrap().entry;
        assert_eq!(entity_name(entry), "班级");
    }
}
