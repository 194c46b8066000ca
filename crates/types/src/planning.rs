//! Complexity assessment and TodoList shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

/// Kind of evidence that raised the complexity score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    MultipleActions,
    Sequencing,
    PlanningVocabulary,
    LongRequest,
    MultipleObjects,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedSignal {
    pub kind: SignalKind,
    pub weight: f64,
    /// Terms or measurements that triggered the signal.
    pub evidence: Vec<String>,
}

/// How the agent should proceed with a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Run the discovery chain once.
    Direct,
    /// Build a TodoList and work through it.
    Decompose,
    /// Hand the request to the activity workflow.
    Workflow,
}

/// Advisory output of the complexity planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplexityAssessment {
    pub level: ComplexityLevel,
    pub score: f64,
    pub signals: Vec<MatchedSignal>,
    pub needs_todo_list: bool,
    pub estimated_steps: usize,
    pub strategy: ExecutionStrategy,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TodoStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TodoStatus::Completed | TodoStatus::Failed | TodoStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodoTask {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TodoStatus,
    /// Completion percentage in `0..=100`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied task before ids and timestamps are assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoTaskDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodoList {
    pub id: String,
    pub title: String,
    pub tasks: Vec<TodoTask>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Counts by status plus the next task to work on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Share of tasks in a terminal status, `0..=100`.
    pub percent_complete: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_task_id: Option<String>,
}

impl TodoList {
    pub fn task(&self, task_id: &str) -> Option<&TodoTask> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn summary(&self) -> TodoSummary {
        let count = |status: TodoStatus| self.tasks.iter().filter(|task| task.status == status).count();
        let total = self.tasks.len();
        let finished = self.tasks.iter().filter(|task| task.status.is_terminal()).count();
        let percent_complete = if total == 0 { 0 } else { (finished * 100 / total) as u8 };
        let next_task_id = self
            .tasks
            .iter()
            .find(|task| task.status == TodoStatus::InProgress)
            .or_else(|| self.tasks.iter().find(|task| task.status == TodoStatus::Pending))
            .map(|task| task.id.clone());

        TodoSummary {
            total,
            pending: count(TodoStatus::Pending),
            in_progress: count(TodoStatus::InProgress),
            completed: count(TodoStatus::Completed),
            failed: count(TodoStatus::Failed),
            cancelled: count(TodoStatus::Cancelled),
            percent_complete,
            next_task_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: TodoStatus) -> TodoTask {
        TodoTask {
            id: id.into(),
            title: id.into(),
            description: None,
            priority: TaskPriority::Medium,
            status,
            progress: None,
            result: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn summary_prefers_in_progress_task_as_next() {
        let now = Utc::now();
        let list = TodoList {
            id: "list".into(),
            title: "t".into(),
            tasks: vec![
                task("a", TodoStatus::Completed),
                task("b", TodoStatus::Pending),
                task("c", TodoStatus::InProgress),
                task("d", TodoStatus::Cancelled),
            ],
            created_at: now,
            updated_at: now,
        };
        let summary = list.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.percent_complete, 50);
        assert_eq!(summary.next_task_id.as_deref(), Some("c"));
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(ComplexityLevel::Simple < ComplexityLevel::Moderate);
        assert!(ComplexityLevel::Complex < ComplexityLevel::VeryComplex);
    }
}
