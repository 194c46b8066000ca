use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedSender;
use tollgate_registry::WorkflowSettings;
use tollgate_types::{
    ActivityProposal, ExecuteWorkflowRequest, GeneratedAsset, WorkflowArtifacts, WorkflowEvent, WorkflowOutcome,
    WorkflowPhase, WorkflowStep, WorkflowStepStatus,
};
use tracing::{info, warn};

use super::delegate::{WorkflowDelegate, string_field};
use super::markdown::{render_completion_markdown, render_proposal_markdown};
use super::proposal::{draft_proposal, extract_details};

/// Tool name reported in workflow events.
pub const WORKFLOW_NAME: &str = "execute_activity_workflow";

/// Drives the eight activity phases.
///
/// A run without `confirmed = true` and an echoed proposal stops at the
/// confirmation phase with no side effects. After confirmation only the
/// create phase is fatal; the asset phases fall back to placeholders.
#[derive(Clone)]
pub struct WorkflowRunner {
    delegate: Arc<dyn WorkflowDelegate>,
    settings: WorkflowSettings,
    today: Option<NaiveDate>,
}

impl WorkflowRunner {
    pub fn new(delegate: Arc<dyn WorkflowDelegate>, settings: WorkflowSettings) -> Self {
        Self {
            delegate,
            settings,
            today: None,
        }
    }

    /// Pins the date used to resolve relative dates in requests.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub async fn run(
        &self,
        request: ExecuteWorkflowRequest,
        events: Option<UnboundedSender<WorkflowEvent>>,
    ) -> WorkflowOutcome {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let mut run = RunState::new(events);
        run.emit(WorkflowEvent::WorkflowStart {
            workflow_name: WORKFLOW_NAME.to_string(),
            steps: run.steps.clone(),
            total_steps: run.steps.len(),
        });

        run.start(WorkflowPhase::Analyze);
        let details = extract_details(&request.user_input, today);
        run.complete(WorkflowPhase::Analyze, false, serde_json::to_value(&details).ok());

        run.start(WorkflowPhase::Propose);
        let confirmed_proposal = request.proposal.clone().filter(|_| request.confirmed);
        let proposal = match (&confirmed_proposal, &request.proposal) {
            (Some(proposal), _) | (None, Some(proposal)) => proposal.clone(),
            (None, None) => draft_proposal(&request.user_input, today),
        };
        run.complete(WorkflowPhase::Propose, false, serde_json::to_value(&proposal).ok());

        run.start(WorkflowPhase::AwaitConfirmation);
        if confirmed_proposal.is_none() {
            return run.await_confirmation(request.user_input, proposal);
        }
        run.complete(WorkflowPhase::AwaitConfirmation, false, Some(json!({"confirmed": true})));
        info!(title = %proposal.title, "activity proposal confirmed");

        run.start(WorkflowPhase::CreatePrimary);
        let activity = match self.delegate.create_activity(&proposal).await {
            Ok(activity) => activity,
            Err(error) => return run.fail(WorkflowPhase::CreatePrimary, error.to_string()),
        };
        let Some(activity_id) = string_field(&activity, &["id"]) else {
            return run.fail(WorkflowPhase::CreatePrimary, "created activity has no id".to_string());
        };
        run.complete(WorkflowPhase::CreatePrimary, false, Some(activity.clone()));
        let mut artifacts = WorkflowArtifacts {
            activity_id: Some(activity_id.clone()),
            activity: Some(activity),
            ..WorkflowArtifacts::default()
        };

        run.start(WorkflowPhase::GeneratePoster);
        let poster = match self.delegate.generate_poster(&proposal, &activity_id).await {
            Ok(url) => asset(None, url, false),
            Err(error) => {
                warn!(%error, "poster generation failed; using placeholder");
                asset(None, format!("/uploads/posters/poster_{}.png", activity_id), true)
            }
        };
        run.complete(WorkflowPhase::GeneratePoster, poster.degraded, serde_json::to_value(&poster).ok());
        artifacts.poster = Some(poster);

        run.start(WorkflowPhase::ConfigureMarketing);
        artifacts.marketing_id = match self.delegate.configure_marketing(&proposal, &activity_id).await {
            Ok(id) => Some(id),
            Err(error) => {
                warn!(%error, "marketing configuration failed; continuing without a campaign");
                None
            }
        };
        run.complete(
            WorkflowPhase::ConfigureMarketing,
            artifacts.marketing_id.is_none(),
            Some(json!({ "marketing_id": artifacts.marketing_id })),
        );

        run.start(WorkflowPhase::GenerateMobilePosters);
        for platform in &self.settings.mobile_platforms {
            let poster = match self.delegate.generate_mobile_poster(&proposal, &activity_id, platform).await {
                Ok(url) => asset(Some(platform), url, false),
                Err(error) => {
                    warn!(%error, platform = %platform, "mobile poster generation failed; using placeholder");
                    let url = format!("/uploads/mobile-posters/{}_{}.png", activity_id, platform);
                    asset(Some(platform), url, true)
                }
            };
            artifacts.mobile_posters.push(poster);
        }
        let mobile_degraded = artifacts.mobile_posters.iter().any(|poster| poster.degraded);
        run.complete(
            WorkflowPhase::GenerateMobilePosters,
            mobile_degraded,
            serde_json::to_value(&artifacts.mobile_posters).ok(),
        );

        run.start(WorkflowPhase::GenerateShareAssets);
        let share_base = self.settings.share_base_url.trim_end_matches('/');
        let share_url = format!("{}/activity/share/{}", share_base, activity_id);
        let registration_url = format!("{}/activity/register/{}", share_base, activity_id);
        let qr_code = match self.delegate.generate_qr_code(&registration_url).await {
            Ok(url) => asset(None, url, false),
            Err(error) => {
                warn!(%error, "qr code generation failed; using placeholder");
                asset(None, placeholder_qr_code(), true)
            }
        };
        run.complete(
            WorkflowPhase::GenerateShareAssets,
            qr_code.degraded,
            Some(json!({
                "share_url": share_url,
                "registration_url": registration_url,
                "qr_code": qr_code,
            })),
        );
        artifacts.share_url = Some(share_url);
        artifacts.registration_url = Some(registration_url);
        artifacts.qr_code = Some(qr_code);

        let markdown = render_completion_markdown(&proposal, &artifacts);
        run.emit(WorkflowEvent::WorkflowComplete {
            workflow_name: WORKFLOW_NAME.to_string(),
            total_steps: run.steps.len(),
            message: format!("活动「{}」已创建", proposal.title),
        });
        info!(activity_id = %activity_id, "activity workflow completed");
        WorkflowOutcome::Completed {
            steps: run.steps,
            artifacts,
            markdown,
        }
    }
}

fn asset(platform: Option<&String>, url: String, degraded: bool) -> GeneratedAsset {
    GeneratedAsset {
        platform: platform.cloned(),
        url,
        degraded,
    }
}

fn placeholder_qr_code() -> String {
    "data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg' width='200' height='200'>\
     <rect width='200' height='200' fill='white' stroke='black'/>\
     <text x='100' y='105' text-anchor='middle' font-size='16'>QR Code</text></svg>"
        .to_string()
}

/// Step table plus the optional progress channel.
struct RunState {
    steps: Vec<WorkflowStep>,
    events: Option<UnboundedSender<WorkflowEvent>>,
}

impl RunState {
    fn new(events: Option<UnboundedSender<WorkflowEvent>>) -> Self {
        Self {
            steps: WorkflowPhase::ALL.iter().copied().map(WorkflowStep::pending).collect(),
            events,
        }
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn start(&mut self, phase: WorkflowPhase) {
        self.steps[phase.index()].status = WorkflowStepStatus::Running;
        self.emit(WorkflowEvent::WorkflowStepStart {
            step_id: phase,
            step_title: phase.title().to_string(),
            step_index: phase.index(),
            total_steps: self.steps.len(),
        });
    }

    fn complete(&mut self, phase: WorkflowPhase, degraded: bool, output: Option<Value>) {
        let step = &mut self.steps[phase.index()];
        step.status = WorkflowStepStatus::Completed;
        step.degraded = degraded;
        step.output = output.clone();
        self.emit(WorkflowEvent::WorkflowStepComplete {
            step_id: phase,
            step_title: phase.title().to_string(),
            step_index: phase.index(),
            total_steps: self.steps.len(),
            degraded,
            output,
        });
    }

    fn await_confirmation(self, user_input: String, proposal: ActivityProposal) -> WorkflowOutcome {
        let phase = WorkflowPhase::AwaitConfirmation;
        self.emit(WorkflowEvent::WorkflowUserConfirmationRequired {
            step_id: phase,
            step_title: phase.title().to_string(),
            step_index: phase.index(),
            total_steps: self.steps.len(),
            proposal: proposal.clone(),
        });
        info!(title = %proposal.title, "activity proposal awaiting confirmation");
        WorkflowOutcome::AwaitingConfirmation {
            markdown: render_proposal_markdown(&proposal),
            steps: self.steps,
            confirm_request: ExecuteWorkflowRequest {
                user_input,
                confirmed: true,
                proposal: Some(proposal.clone()),
            },
            proposal,
            message: "Show the plan to the user. Nothing has been created yet; after they approve, call \
                      execute_activity_workflow again with confirm_request unchanged."
                .to_string(),
        }
    }

    fn fail(mut self, phase: WorkflowPhase, error: String) -> WorkflowOutcome {
        warn!(phase = phase.id(), %error, "activity workflow failed");
        self.steps[phase.index()].status = WorkflowStepStatus::Failed;
        self.emit(WorkflowEvent::WorkflowError {
            step_id: Some(phase),
            step_index: Some(phase.index()),
            total_steps: self.steps.len(),
            error: error.clone(),
        });
        WorkflowOutcome::Failed {
            steps: self.steps,
            failed_step: phase,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::delegate::DelegateError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc::unbounded_channel;

    #[derive(Default)]
    struct FakeDelegate {
        calls: Mutex<Vec<String>>,
        fail_create: bool,
        fail_assets: bool,
    }

    impl FakeDelegate {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn asset_result(&self, url: &str) -> Result<String, DelegateError> {
            if self.fail_assets {
                Err(DelegateError::MissingField {
                    endpoint: "/api/ai/images/generate".into(),
                    field: "url".into(),
                })
            } else {
                Ok(url.to_string())
            }
        }
    }

    #[async_trait]
    impl WorkflowDelegate for FakeDelegate {
        async fn create_activity(&self, proposal: &ActivityProposal) -> Result<Value, DelegateError> {
            self.record("create_activity");
            if self.fail_create {
                return Err(DelegateError::Upstream {
                    endpoint: "/api/activities".into(),
                    status: 500,
                    body: json!({"message": "database unavailable"}),
                });
            }
            Ok(json!({"id": 42, "title": proposal.title}))
        }

        async fn generate_poster(&self, _: &ActivityProposal, _: &str) -> Result<String, DelegateError> {
            self.record("generate_poster");
            self.asset_result("https://cdn.example.com/poster.png")
        }

        async fn configure_marketing(&self, _: &ActivityProposal, _: &str) -> Result<String, DelegateError> {
            self.record("configure_marketing");
            self.asset_result("mk-1")
        }

        async fn generate_mobile_poster(
            &self,
            _: &ActivityProposal,
            _: &str,
            platform: &str,
        ) -> Result<String, DelegateError> {
            self.record(&format!("generate_mobile_poster:{}", platform));
            self.asset_result("https://cdn.example.com/mobile.png")
        }

        async fn generate_qr_code(&self, target_url: &str) -> Result<String, DelegateError> {
            self.record("generate_qr_code");
            self.asset_result(&format!("https://cdn.example.com/qr?for={}", target_url))
        }
    }

    fn runner(delegate: Arc<FakeDelegate>) -> WorkflowRunner {
        WorkflowRunner::new(delegate, WorkflowSettings::default()).with_today(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
    }

    fn first_call() -> ExecuteWorkflowRequest {
        ExecuteWorkflowRequest {
            user_input: "帮我策划一个亲子运动会".into(),
            confirmed: false,
            proposal: None,
        }
    }

    async fn confirm_request(runner: &WorkflowRunner) -> ExecuteWorkflowRequest {
        match runner.run(first_call(), None).await {
            WorkflowOutcome::AwaitingConfirmation { confirm_request, .. } => confirm_request,
            other => panic!("expected confirmation gate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn first_call_stops_at_the_gate_without_side_effects() {
        let delegate = Arc::new(FakeDelegate::default());
        let outcome = runner(delegate.clone()).run(first_call(), None).await;

        let WorkflowOutcome::AwaitingConfirmation { proposal, steps, confirm_request, markdown, .. } = outcome else {
            panic!("expected confirmation gate");
        };
        assert!(delegate.calls().is_empty());
        assert_eq!(proposal.title, "亲子运动会");
        assert!(markdown.contains("## 活动流程"));
        assert_eq!(steps[2].status, WorkflowStepStatus::Running);
        assert!(steps[3..].iter().all(|step| step.status == WorkflowStepStatus::Pending));
        assert!(confirm_request.confirmed);
        assert_eq!(confirm_request.proposal, Some(proposal));
    }

    #[tokio::test]
    async fn confirmed_flag_without_proposal_proposes_again() {
        let delegate = Arc::new(FakeDelegate::default());
        let mut request = first_call();
        request.confirmed = true;
        let outcome = runner(delegate.clone()).run(request, None).await;
        assert!(matches!(outcome, WorkflowOutcome::AwaitingConfirmation { .. }));
        assert!(delegate.calls().is_empty());
    }

    #[tokio::test]
    async fn confirmed_run_creates_once_and_builds_share_links() {
        let delegate = Arc::new(FakeDelegate::default());
        let runner = runner(delegate.clone());
        let request = confirm_request(&runner).await;

        let WorkflowOutcome::Completed { steps, artifacts, markdown } = runner.run(request, None).await else {
            panic!("expected completion");
        };

        assert!(steps.iter().all(|step| step.status == WorkflowStepStatus::Completed && !step.degraded));
        assert_eq!(delegate.calls().iter().filter(|call| *call == "create_activity").count(), 1);
        assert_eq!(artifacts.activity_id.as_deref(), Some("42"));
        assert_eq!(artifacts.mobile_posters.len(), 2);
        assert_eq!(artifacts.share_url.as_deref(), Some("http://localhost:5173/activity/share/42"));
        assert_eq!(
            artifacts.qr_code.unwrap().url,
            "https://cdn.example.com/qr?for=http://localhost:5173/activity/register/42"
        );
        assert!(markdown.contains("活动ID：42"));
    }

    #[tokio::test]
    async fn create_failure_aborts_before_asset_phases() {
        let delegate = Arc::new(FakeDelegate {
            fail_create: true,
            ..FakeDelegate::default()
        });
        let runner = runner(delegate.clone());
        let request = confirm_request(&runner).await;
        let (events_tx, mut events_rx) = unbounded_channel();

        let outcome = runner.run(request, Some(events_tx)).await;

        let WorkflowOutcome::Failed { failed_step, steps, error } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failed_step, WorkflowPhase::CreatePrimary);
        assert!(error.contains("500"));
        assert_eq!(steps[3].status, WorkflowStepStatus::Failed);
        assert!(steps[4..].iter().all(|step| step.status == WorkflowStepStatus::Pending));
        assert_eq!(delegate.calls(), vec!["create_activity".to_string()]);

        let mut last = None;
        while let Ok(event) = events_rx.try_recv() {
            last = Some(event);
        }
        assert!(matches!(last, Some(WorkflowEvent::WorkflowError { step_index: Some(3), .. })));
    }

    #[tokio::test]
    async fn asset_failures_degrade_instead_of_aborting() {
        let delegate = Arc::new(FakeDelegate {
            fail_assets: true,
            ..FakeDelegate::default()
        });
        let runner = runner(delegate.clone());
        let request = confirm_request(&runner).await;

        let WorkflowOutcome::Completed { steps, artifacts, .. } = runner.run(request, None).await else {
            panic!("asset failures must not abort the run");
        };

        assert!(steps[4..].iter().all(|step| step.status == WorkflowStepStatus::Completed && step.degraded));
        assert_eq!(artifacts.poster.unwrap().url, "/uploads/posters/poster_42.png");
        assert!(artifacts.marketing_id.is_none());
        assert_eq!(artifacts.mobile_posters[1].url, "/uploads/mobile-posters/42_weibo.png");
        assert!(artifacts.qr_code.unwrap().url.starts_with("data:image/svg+xml"));
        assert_eq!(artifacts.registration_url.as_deref(), Some("http://localhost:5173/activity/register/42"));
    }

    #[tokio::test]
    async fn events_follow_phase_order() {
        let delegate = Arc::new(FakeDelegate::default());
        let runner = runner(delegate);
        let request = confirm_request(&runner).await;
        let (events_tx, mut events_rx) = unbounded_channel();

        runner.run(request, Some(events_tx)).await;

        let mut events = Vec::new();
        while let Ok(event) = events_rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(WorkflowEvent::WorkflowStart { total_steps: 8, .. })));
        assert!(matches!(events.last(), Some(WorkflowEvent::WorkflowComplete { .. })));
        let started: Vec<usize> = events
            .iter()
            .filter_map(|event| match event {
                WorkflowEvent::WorkflowStepStart { step_index, .. } => Some(*step_index),
                _ => None,
            })
            .collect();
        assert_eq!(started, (0..8).collect::<Vec<_>>());
    }
}
