//! Side effects of the activity workflow, behind a trait so the runner can be
//! driven against the business API or a test double.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;
use tollgate_registry::WorkflowSettings;
use tollgate_types::{ActivityProposal, ExecuteOperationRequest, ExecutionOutcome, HttpMethod};
use tracing::{debug, info};

use crate::executor::{GuardedExecutor, Transport, TransportError, TransportRequest, unwrap_envelope};

const API_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const POSTER_SIZE: &str = "1024x1024";
const MOBILE_POSTER_SIZE: &str = "768x1024";

#[derive(Debug, Error)]
pub enum DelegateError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{endpoint} answered {status}: {body}")]
    Upstream { endpoint: String, status: u16, body: Value },
    #[error("{endpoint} response has no '{field}'")]
    MissingField { endpoint: String, field: String },
    #[error("{endpoint} needs fields the proposal does not provide: {}", fields.join(", "))]
    MissingRequiredFields { endpoint: String, fields: Vec<String> },
    #[error("{endpoint} failed: {error}")]
    Rejected {
        endpoint: String,
        status: Option<u16>,
        error: Value,
    },
}

/// One call per post-confirmation phase.
#[async_trait]
pub trait WorkflowDelegate: Send + Sync {
    /// Creates the activity record and returns it; the record must carry an `id`.
    async fn create_activity(&self, proposal: &ActivityProposal) -> Result<Value, DelegateError>;

    /// Returns the poster image URL.
    async fn generate_poster(&self, proposal: &ActivityProposal, activity_id: &str) -> Result<String, DelegateError>;

    /// Returns the marketing campaign id.
    async fn configure_marketing(
        &self,
        proposal: &ActivityProposal,
        activity_id: &str,
    ) -> Result<String, DelegateError>;

    async fn generate_mobile_poster(
        &self,
        proposal: &ActivityProposal,
        activity_id: &str,
        platform: &str,
    ) -> Result<String, DelegateError>;

    /// Returns a URL or data URI of a QR code encoding `target_url`.
    async fn generate_qr_code(&self, target_url: &str) -> Result<String, DelegateError>;
}

/// [`WorkflowDelegate`] that POSTs to the configured business endpoints.
///
/// With an executor attached, record-creating calls (activity and marketing)
/// go through the catalog's required-field check first; endpoints the catalog
/// does not describe are posted directly.
#[derive(Clone)]
pub struct TransportWorkflowDelegate {
    transport: Arc<dyn Transport>,
    settings: WorkflowSettings,
    bearer_token: Option<String>,
    executor: Option<GuardedExecutor>,
}

impl TransportWorkflowDelegate {
    pub fn new(transport: Arc<dyn Transport>, settings: WorkflowSettings, bearer_token: Option<String>) -> Self {
        Self {
            transport,
            settings,
            bearer_token,
            executor: None,
        }
    }

    pub fn with_executor(mut self, executor: GuardedExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Creates a record as an already-confirmed `execute_operation` call.
    async fn create_record(&self, endpoint: &str, body: Value) -> Result<Value, DelegateError> {
        let Some(executor) = &self.executor else {
            return self.post(endpoint, body).await;
        };
        let request = ExecuteOperationRequest::new(endpoint, HttpMethod::Post)
            .with_body(body.clone())
            .confirmed();
        let Ok(outcome) = executor.execute(request).await else {
            return self.post(endpoint, body).await;
        };
        match outcome {
            ExecutionOutcome::Success { data, .. } => Ok(data),
            ExecutionOutcome::MissingRequiredFields { missing_fields, .. } => {
                info!(endpoint, missing = missing_fields.len(), "workflow record held for missing fields");
                Err(DelegateError::MissingRequiredFields {
                    endpoint: endpoint.to_string(),
                    fields: missing_fields.into_iter().map(|field| field.name).collect(),
                })
            }
            ExecutionOutcome::Error {
                catalog_miss: Some(_), ..
            } => self.post(endpoint, body).await,
            ExecutionOutcome::Error { status_code, error, .. } => Err(DelegateError::Rejected {
                endpoint: endpoint.to_string(),
                status: status_code,
                error,
            }),
            ExecutionOutcome::WaitForConfirmation { .. } => Err(DelegateError::Rejected {
                endpoint: endpoint.to_string(),
                status: None,
                error: json!({ "message": "operation is still awaiting confirmation" }),
            }),
        }
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value, DelegateError> {
        let response = self
            .transport
            .send(TransportRequest {
                method: HttpMethod::Post,
                path: endpoint.to_string(),
                query: Vec::new(),
                body: Some(body),
                bearer_token: self.bearer_token.clone(),
            })
            .await?;
        if !response.is_success() {
            return Err(DelegateError::Upstream {
                endpoint: endpoint.to_string(),
                status: response.status,
                body: response.body,
            });
        }
        let (data, _) = unwrap_envelope(response.body).map_err(|body| DelegateError::Upstream {
            endpoint: endpoint.to_string(),
            status: response.status,
            body,
        })?;
        debug!(endpoint, "workflow call succeeded");
        Ok(data)
    }

    async fn generate_image(&self, prompt: String, size: &str) -> Result<String, DelegateError> {
        let endpoint = &self.settings.image_endpoint;
        let data = self
            .post(
                endpoint,
                json!({
                    "prompt": prompt,
                    "size": size,
                    "category": "activity-poster",
                }),
            )
            .await?;
        string_field(&data, &["imageUrl", "url"]).ok_or_else(|| missing(endpoint, "imageUrl"))
    }
}

#[async_trait]
impl WorkflowDelegate for TransportWorkflowDelegate {
    async fn create_activity(&self, proposal: &ActivityProposal) -> Result<Value, DelegateError> {
        let endpoint = &self.settings.primary_endpoint;
        let activity = self.create_record(endpoint, activity_body(proposal)).await?;
        if string_field(&activity, &["id"]).is_none() {
            return Err(missing(endpoint, "id"));
        }
        Ok(activity)
    }

    async fn generate_poster(&self, proposal: &ActivityProposal, _activity_id: &str) -> Result<String, DelegateError> {
        let prompt = format!(
            "{}海报，{}，时间{}，地点{}，色彩明亮、适合幼儿园",
            proposal.title,
            proposal.activity_type.label(),
            proposal.start_time.format("%Y年%m月%d日"),
            proposal.location
        );
        self.generate_image(prompt, POSTER_SIZE).await
    }

    async fn configure_marketing(
        &self,
        proposal: &ActivityProposal,
        activity_id: &str,
    ) -> Result<String, DelegateError> {
        let endpoint = &self.settings.marketing_endpoint;
        let activity_id = activity_id.parse::<i64>().map(Value::from).unwrap_or_else(|_| json!(activity_id));
        let data = self
            .create_record(
                endpoint,
                json!({
                    "activityId": activity_id,
                    "name": format!("{}推广", proposal.title),
                    "channels": self.settings.mobile_platforms,
                }),
            )
            .await?;
        string_field(&data, &["id"]).ok_or_else(|| missing(endpoint, "id"))
    }

    async fn generate_mobile_poster(
        &self,
        proposal: &ActivityProposal,
        _activity_id: &str,
        platform: &str,
    ) -> Result<String, DelegateError> {
        let prompt = format!("{}竖版海报，适配{}分享，{}", proposal.title, platform, proposal.activity_type.label());
        self.generate_image(prompt, MOBILE_POSTER_SIZE).await
    }

    async fn generate_qr_code(&self, target_url: &str) -> Result<String, DelegateError> {
        let endpoint = &self.settings.qrcode_endpoint;
        let data = self.post(endpoint, json!({ "content": target_url })).await?;
        string_field(&data, &["url", "qrCodeUrl", "dataUrl"]).ok_or_else(|| missing(endpoint, "url"))
    }
}

/// Request body for the activity create operation.
pub fn activity_body(proposal: &ActivityProposal) -> Value {
    json!({
        "title": proposal.title,
        "activityType": proposal.activity_type,
        "description": proposal.description,
        "startTime": proposal.start_time.format(API_DATE_TIME_FORMAT).to_string(),
        "endTime": proposal.end_time.format(API_DATE_TIME_FORMAT).to_string(),
        "location": proposal.location,
        "capacity": proposal.capacity,
        "fee": proposal.fee,
        "targetAudience": proposal.target_audience,
        "status": "draft",
    })
}

/// First of `keys` present as a string or number, rendered as a string.
pub fn string_field(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match data.get(*key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

fn missing(endpoint: &str, field: &str) -> DelegateError {
    DelegateError::MissingField {
        endpoint: endpoint.to_string(),
        field: field.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TransportResponse;
    use crate::executor::tests::RecordingTransport;
    use crate::workflow::proposal::draft_proposal;
    use chrono::NaiveDate;

    fn proposal() -> ActivityProposal {
        draft_proposal("帮我策划一个亲子运动会", NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
    }

    fn ok(body: Value) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse { status: 200, body })
    }

    #[tokio::test]
    async fn create_activity_posts_the_plan_and_requires_an_id() {
        let transport = Arc::new(RecordingTransport::answering(vec![ok(
            json!({"success": true, "data": {"id": 42, "title": "亲子运动会"}}),
        )]));
        let delegate = TransportWorkflowDelegate::new(transport.clone(), WorkflowSettings::default(), None);

        let activity = delegate.create_activity(&proposal()).await.unwrap();

        assert_eq!(activity["id"], 42);
        let sent = transport.sent();
        assert_eq!(sent[0].path, "/api/activities");
        let body = sent[0].body.as_ref().unwrap();
        assert_eq!(body["startTime"], "2025-03-17T09:00:00");
        assert_eq!(body["activityType"], "sports");
        assert_eq!(body["status"], "draft");
    }

    #[tokio::test]
    async fn activity_without_id_is_an_error() {
        let transport = Arc::new(RecordingTransport::answering(vec![ok(json!({"title": "x"}))]));
        let delegate = TransportWorkflowDelegate::new(transport, WorkflowSettings::default(), None);
        assert!(matches!(
            delegate.create_activity(&proposal()).await,
            Err(DelegateError::MissingField { .. })
        ));
    }

    #[tokio::test]
    async fn failed_envelope_is_an_upstream_error() {
        let transport = Arc::new(RecordingTransport::answering(vec![ok(
            json!({"success": false, "message": "quota exceeded"}),
        )]));
        let delegate = TransportWorkflowDelegate::new(transport, WorkflowSettings::default(), None);
        let error = delegate.generate_poster(&proposal(), "42").await.unwrap_err();
        assert!(matches!(error, DelegateError::Upstream { status: 200, .. }));
    }

    #[tokio::test]
    async fn marketing_uses_numeric_activity_id_and_platform_channels() {
        let transport = Arc::new(RecordingTransport::answering(vec![ok(json!({"id": "mk-1"}))]));
        let delegate = TransportWorkflowDelegate::new(transport.clone(), WorkflowSettings::default(), None);

        let id = delegate.configure_marketing(&proposal(), "42").await.unwrap();

        assert_eq!(id, "mk-1");
        let body = transport.sent()[0].body.clone().unwrap();
        assert_eq!(body["activityId"], 42);
        assert_eq!(body["name"], "亲子运动会推广");
        assert_eq!(body["channels"], json!(["wechat", "weibo"]));
    }

    fn catalog_delegate(transport: Arc<RecordingTransport>) -> TransportWorkflowDelegate {
        let catalog = Arc::new(tollgate_registry::CatalogIndex::from_embedded().unwrap());
        let executor = GuardedExecutor::new(catalog, transport.clone());
        TransportWorkflowDelegate::new(transport, WorkflowSettings::default(), None).with_executor(executor)
    }

    #[tokio::test]
    async fn catalog_backed_create_runs_once_without_a_second_confirmation() {
        let transport = Arc::new(RecordingTransport::answering(vec![ok(
            json!({"success": true, "data": {"id": 42}}),
        )]));
        let delegate = catalog_delegate(transport.clone());

        let activity = delegate.create_activity(&proposal()).await.unwrap();

        assert_eq!(activity["id"], 42);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].body, Some(activity_body(&proposal())));
    }

    #[tokio::test]
    async fn catalog_required_fields_hold_the_create() {
        let transport = Arc::new(RecordingTransport::default());
        let delegate = catalog_delegate(transport.clone());
        let mut plan = proposal();
        plan.location = "  ".into();

        let error = delegate.create_activity(&plan).await.unwrap_err();

        let DelegateError::MissingRequiredFields { endpoint, fields } = error else {
            panic!("expected missing required fields, got {error:?}");
        };
        assert_eq!(endpoint, "/api/activities");
        assert_eq!(fields, vec!["location".to_string()]);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn rejected_create_keeps_the_upstream_payload() {
        let payload = json!({"success": false, "message": "活动时间冲突"});
        let transport = Arc::new(RecordingTransport::answering(vec![Ok(TransportResponse {
            status: 409,
            body: payload.clone(),
        })]));
        let delegate = catalog_delegate(transport);

        let error = delegate.create_activity(&proposal()).await.unwrap_err();

        assert!(matches!(
            error,
            DelegateError::Rejected { status: Some(409), error, .. } if error == payload
        ));
    }

    #[tokio::test]
    async fn endpoints_outside_the_catalog_are_posted_directly() {
        let transport = Arc::new(RecordingTransport::answering(vec![ok(json!({"id": 9}))]));
        let catalog = Arc::new(tollgate_registry::CatalogIndex::from_embedded().unwrap());
        let executor = GuardedExecutor::new(catalog, transport.clone());
        let settings = WorkflowSettings {
            primary_endpoint: "/api/events".into(),
            ..WorkflowSettings::default()
        };
        let delegate = TransportWorkflowDelegate::new(transport.clone(), settings, None).with_executor(executor);

        let activity = delegate.create_activity(&proposal()).await.unwrap();

        assert_eq!(activity["id"], 9);
        assert_eq!(transport.sent()[0].path, "/api/events");
    }

    #[test]
    fn string_field_accepts_numbers() {
        assert_eq!(string_field(&json!({"id": 7}), &["id"]), Some("7".into()));
        assert_eq!(string_field(&json!({"url": ""}), &["url", "qrCodeUrl"]), None);
    }
}
