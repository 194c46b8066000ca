//! Activity workflow model: the fixed phase list, run state, progress events
//! and the proposal a human confirms before anything is created.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed phases of the activity workflow, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Analyze,
    Propose,
    AwaitConfirmation,
    CreatePrimary,
    GeneratePoster,
    ConfigureMarketing,
    GenerateMobilePosters,
    GenerateShareAssets,
}

impl WorkflowPhase {
    pub const ALL: [WorkflowPhase; 8] = [
        WorkflowPhase::Analyze,
        WorkflowPhase::Propose,
        WorkflowPhase::AwaitConfirmation,
        WorkflowPhase::CreatePrimary,
        WorkflowPhase::GeneratePoster,
        WorkflowPhase::ConfigureMarketing,
        WorkflowPhase::GenerateMobilePosters,
        WorkflowPhase::GenerateShareAssets,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            WorkflowPhase::Analyze => "analyze",
            WorkflowPhase::Propose => "propose",
            WorkflowPhase::AwaitConfirmation => "await_confirmation",
            WorkflowPhase::CreatePrimary => "create_primary",
            WorkflowPhase::GeneratePoster => "generate_poster",
            WorkflowPhase::ConfigureMarketing => "configure_marketing",
            WorkflowPhase::GenerateMobilePosters => "generate_mobile_posters",
            WorkflowPhase::GenerateShareAssets => "generate_share_assets",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WorkflowPhase::Analyze => "Analyze request",
            WorkflowPhase::Propose => "Draft activity proposal",
            WorkflowPhase::AwaitConfirmation => "Await confirmation",
            WorkflowPhase::CreatePrimary => "Create activity",
            WorkflowPhase::GeneratePoster => "Generate poster",
            WorkflowPhase::ConfigureMarketing => "Configure marketing",
            WorkflowPhase::GenerateMobilePosters => "Generate mobile posters",
            WorkflowPhase::GenerateShareAssets => "Generate share link and QR code",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WorkflowPhase::Analyze => "Extract activity type, date, location and audience from the request",
            WorkflowPhase::Propose => "Fill in a complete activity plan with per-type defaults",
            WorkflowPhase::AwaitConfirmation => "Present the plan and wait for explicit approval",
            WorkflowPhase::CreatePrimary => "Create the activity record",
            WorkflowPhase::GeneratePoster => "Render the promotional poster",
            WorkflowPhase::ConfigureMarketing => "Set up the marketing campaign",
            WorkflowPhase::GenerateMobilePosters => "Render posters sized for social platforms",
            WorkflowPhase::GenerateShareAssets => "Build the share link, registration link and QR code",
        }
    }

    /// Zero-based position in [`WorkflowPhase::ALL`].
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|phase| phase == self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStep {
    pub id: WorkflowPhase,
    pub title: String,
    pub description: String,
    pub status: WorkflowStepStatus,
    /// Set when the phase finished with a placeholder instead of a real artifact.
    #[serde(default)]
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl WorkflowStep {
    pub fn pending(phase: WorkflowPhase) -> Self {
        Self {
            id: phase,
            title: phase.title().to_string(),
            description: phase.description().to_string(),
            status: WorkflowStepStatus::Pending,
            degraded: false,
            output: None,
        }
    }
}

/// Progress events emitted while a workflow runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    WorkflowStart {
        workflow_name: String,
        steps: Vec<WorkflowStep>,
        total_steps: usize,
    },
    WorkflowStepStart {
        step_id: WorkflowPhase,
        step_title: String,
        step_index: usize,
        total_steps: usize,
    },
    WorkflowStepComplete {
        step_id: WorkflowPhase,
        step_title: String,
        step_index: usize,
        total_steps: usize,
        degraded: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
    },
    WorkflowUserConfirmationRequired {
        step_id: WorkflowPhase,
        step_title: String,
        step_index: usize,
        total_steps: usize,
        proposal: ActivityProposal,
    },
    WorkflowComplete {
        workflow_name: String,
        total_steps: usize,
        message: String,
    },
    WorkflowError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<WorkflowPhase>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_index: Option<usize>,
        total_steps: usize,
        error: String,
    },
}

/// Activity category inferred from the request wording.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Sports,
    ParentChild,
    Festival,
    Arts,
    Science,
    Outdoor,
    General,
}

impl ActivityType {
    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::Sports => "体育运动",
            ActivityType::ParentChild => "亲子活动",
            ActivityType::Festival => "节日庆典",
            ActivityType::Arts => "艺术活动",
            ActivityType::Science => "科学探索",
            ActivityType::Outdoor => "户外活动",
            ActivityType::General => "综合活动",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleItem {
    pub time: String,
    pub content: String,
}

/// Complete activity plan shown to the human before creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityProposal {
    pub title: String,
    pub activity_type: ActivityType,
    pub description: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub location: String,
    pub capacity: u32,
    #[serde(default)]
    pub fee: f64,
    #[serde(default)]
    pub requirements: String,
    pub target_audience: String,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub schedule: Vec<ScheduleItem>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Arguments of `execute_activity_workflow`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteWorkflowRequest {
    pub user_input: String,
    #[serde(default)]
    pub confirmed: bool,
    /// The proposal returned by the first call, echoed back on confirmation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<ActivityProposal>,
}

/// A rendered image plus whether it is a placeholder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    pub url: String,
    pub degraded: bool,
}

/// Everything produced after confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WorkflowArtifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<GeneratedAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_id: Option<String>,
    #[serde(default)]
    pub mobile_posters: Vec<GeneratedAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<GeneratedAsset>,
}

/// Result of one `execute_activity_workflow` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    AwaitingConfirmation {
        proposal: ActivityProposal,
        markdown: String,
        steps: Vec<WorkflowStep>,
        /// The exact arguments to resend once approved.
        confirm_request: ExecuteWorkflowRequest,
        message: String,
    },
    Completed {
        steps: Vec<WorkflowStep>,
        artifacts: WorkflowArtifacts,
        markdown: String,
    },
    Failed {
        steps: Vec<WorkflowStep>,
        failed_step: WorkflowPhase,
        error: String,
    },
}
