use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tollgate_types::{CreateTodoListArgs, TaskPriority, TodoList, TodoStatus, TodoTask, TodoTaskDraft, UpdateTodoTaskArgs};
use tollgate_util::char_length;
use tracing::{debug, info};
use uuid::Uuid;

static INTENT_SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)首先|然后|接着|随后|之后|最后|并且|同时|[，,。；;！!？?\n]|\bthen\b|\bfinally\b|\bfirst\b|\band\b").unwrap()
});

const MIN_TASK_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    #[error("todo list '{0}' does not exist")]
    ListNotFound(String),
    #[error("task '{task_id}' does not exist in todo list '{list_id}'")]
    TaskNotFound { list_id: String, task_id: String },
    #[error("task '{task_id}' is already {status:?}; finished tasks cannot change")]
    TaskFinished { task_id: String, status: TodoStatus },
    #[error("progress {0} is outside 0..=100")]
    ProgressOutOfRange(u8),
    #[error("a todo list needs at least one task; pass tasks or a user_input to split")]
    NoTasks,
}

/// Builds a list from explicit drafts, or by splitting `user_input` (falling
/// back to the title) into steps when no drafts are given.
pub fn create_todo_list(args: CreateTodoListArgs, now: DateTime<Utc>) -> Result<TodoList, TodoError> {
    let drafts = if args.tasks.is_empty() {
        decompose_intent(args.user_input.as_deref().unwrap_or(&args.title))
    } else {
        args.tasks
    };
    let tasks: Vec<TodoTask> = drafts
        .into_iter()
        .filter(|draft| !draft.title.trim().is_empty())
        .map(|draft| TodoTask {
            id: Uuid::new_v4().to_string(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            priority: draft.priority,
            status: TodoStatus::Pending,
            progress: None,
            result: None,
            updated_at: now,
        })
        .collect();
    if tasks.is_empty() {
        return Err(TodoError::NoTasks);
    }

    Ok(TodoList {
        id: Uuid::new_v4().to_string(),
        title: args.title.trim().to_string(),
        tasks,
        created_at: now,
        updated_at: now,
    })
}

/// Splits a compound request on sequencing words and punctuation.
///
/// The first step is high priority; fragments shorter than two characters are dropped.
pub fn decompose_intent(user_input: &str) -> Vec<TodoTaskDraft> {
    INTENT_SEPARATORS
        .split(user_input)
        .map(str::trim)
        .filter(|fragment| char_length(fragment) >= MIN_TASK_CHARS)
        .enumerate()
        .map(|(position, fragment)| TodoTaskDraft {
            title: fragment.to_string(),
            description: None,
            priority: if position == 0 {
                TaskPriority::High
            } else {
                TaskPriority::Medium
            },
        })
        .collect()
}

/// Applies one `update_todo_task` call.
///
/// Finished tasks (completed, failed, cancelled) reject every change.
/// Completing a task forces progress to 100; reporting progress on a pending
/// task moves it to in-progress.
pub fn update_task(list: &mut TodoList, args: &UpdateTodoTaskArgs, now: DateTime<Utc>) -> Result<TodoTask, TodoError> {
    if let Some(progress) = args.progress.filter(|progress| *progress > 100) {
        return Err(TodoError::ProgressOutOfRange(progress));
    }
    let list_id = list.id.clone();
    let task = list
        .tasks
        .iter_mut()
        .find(|task| task.id == args.task_id)
        .ok_or_else(|| TodoError::TaskNotFound {
            list_id,
            task_id: args.task_id.clone(),
        })?;
    if task.status.is_terminal() {
        return Err(TodoError::TaskFinished {
            task_id: task.id.clone(),
            status: task.status,
        });
    }

    if let Some(priority) = args.priority {
        task.priority = priority;
    }
    if let Some(progress) = args.progress {
        task.progress = Some(progress);
        if progress > 0 && task.status == TodoStatus::Pending && args.status.is_none() {
            task.status = TodoStatus::InProgress;
        }
    }
    if let Some(status) = args.status {
        task.status = status;
        if status == TodoStatus::Completed {
            task.progress = Some(100);
        }
    }
    if let Some(result) = &args.result {
        task.result = Some(result.clone());
    }
    task.updated_at = now;
    let updated = task.clone();
    list.updated_at = now;
    debug!(list_id = %list.id, task_id = %updated.id, status = ?updated.status, "todo task updated");
    Ok(updated)
}

/// In-memory store of todo lists keyed by list id.
///
/// Lists live until [`TodoBoard::remove`] drops them.
#[derive(Debug, Default)]
pub struct TodoBoard {
    lists: Mutex<HashMap<String, TodoList>>,
}

impl TodoBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, args: CreateTodoListArgs) -> Result<TodoList, TodoError> {
        let list = create_todo_list(args, Utc::now())?;
        info!(list_id = %list.id, tasks = list.tasks.len(), "todo list created");
        self.lists
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(list.id.clone(), list.clone());
        Ok(list)
    }

    /// Updates one task and returns the task plus the list after the change.
    pub fn update(&self, args: &UpdateTodoTaskArgs) -> Result<(TodoTask, TodoList), TodoError> {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        let list = lists
            .get_mut(&args.list_id)
            .ok_or_else(|| TodoError::ListNotFound(args.list_id.clone()))?;
        let task = update_task(list, args, Utc::now())?;
        Ok((task, list.clone()))
    }

    pub fn get(&self, list_id: &str) -> Option<TodoList> {
        self.lists
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(list_id)
            .cloned()
    }

    pub fn remove(&self, list_id: &str) -> Option<TodoList> {
        self.lists
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(list_id)
    }

    pub fn len(&self) -> usize {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(title: &str, user_input: Option<&str>) -> CreateTodoListArgs {
        CreateTodoListArgs {
            title: title.into(),
            user_input: user_input.map(str::to_string),
            tasks: vec![],
        }
    }

    fn update(list: &TodoList, task: usize) -> UpdateTodoTaskArgs {
        UpdateTodoTaskArgs {
            list_id: list.id.clone(),
            task_id: list.tasks[task].id.clone(),
            status: None,
            progress: None,
            priority: None,
            result: None,
        }
    }

    #[test]
    fn splits_compound_intent_on_sequencing_words() {
        let drafts = decompose_intent("首先创建班级，然后添加学生，最后发送通知");
        let titles: Vec<&str> = drafts.iter().map(|draft| draft.title.as_str()).collect();
        assert_eq!(titles, vec!["创建班级", "添加学生", "发送通知"]);
        assert_eq!(drafts[0].priority, TaskPriority::High);
        assert_eq!(drafts[2].priority, TaskPriority::Medium);
    }

    #[test]
    fn english_requests_split_on_then() {
        let drafts = decompose_intent("create a class then enroll students and finally notify parents");
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[1].title, "enroll students");
    }

    #[test]
    fn explicit_tasks_win_over_decomposition() {
        let mut create = args("迎新", Some("首先A，然后B"));
        create.tasks = vec![TodoTaskDraft {
            title: "准备物料".into(),
            description: Some("彩带和气球".into()),
            priority: TaskPriority::Low,
        }];
        let list = create_todo_list(create, Utc::now()).unwrap();
        assert_eq!(list.tasks.len(), 1);
        assert_eq!(list.tasks[0].priority, TaskPriority::Low);
    }

    #[test]
    fn blank_input_is_rejected() {
        assert_eq!(create_todo_list(args(" ", None), Utc::now()), Err(TodoError::NoTasks));
    }

    #[test]
    fn completion_forces_full_progress() {
        let mut list = create_todo_list(args("t", Some("创建班级，添加学生")), Utc::now()).unwrap();
        let mut change = update(&list, 0);
        change.status = Some(TodoStatus::Completed);
        change.result = Some(json!({"id": 4}));

        let task = update_task(&mut list, &change, Utc::now()).unwrap();

        assert_eq!(task.progress, Some(100));
        assert_eq!(list.summary().completed, 1);
        assert_eq!(list.summary().next_task_id, Some(list.tasks[1].id.clone()));
    }

    #[test]
    fn progress_moves_pending_task_in_progress() {
        let mut list = create_todo_list(args("t", Some("创建班级，添加学生")), Utc::now()).unwrap();
        let mut change = update(&list, 1);
        change.progress = Some(40);
        let task = update_task(&mut list, &change, Utc::now()).unwrap();
        assert_eq!(task.status, TodoStatus::InProgress);
    }

    #[test]
    fn finished_tasks_are_final() {
        let mut list = create_todo_list(args("t", Some("创建班级，添加学生")), Utc::now()).unwrap();
        let mut cancel = update(&list, 0);
        cancel.status = Some(TodoStatus::Cancelled);
        update_task(&mut list, &cancel, Utc::now()).unwrap();

        let mut reopen = update(&list, 0);
        reopen.status = Some(TodoStatus::InProgress);
        assert!(matches!(
            update_task(&mut list, &reopen, Utc::now()),
            Err(TodoError::TaskFinished { status: TodoStatus::Cancelled, .. })
        ));
    }

    #[test]
    fn progress_above_hundred_is_rejected() {
        let mut list = create_todo_list(args("t", Some("创建班级")), Utc::now()).unwrap();
        let mut change = update(&list, 0);
        change.progress = Some(101);
        assert_eq!(update_task(&mut list, &change, Utc::now()), Err(TodoError::ProgressOutOfRange(101)));
    }

    #[test]
    fn board_keeps_lists_until_removed() {
        let board = TodoBoard::new();
        let list = board.create(args("t", Some("创建班级，添加学生"))).unwrap();

        let mut change = update(&list, 0);
        change.status = Some(TodoStatus::InProgress);
        let (task, updated) = board.update(&change).unwrap();
        assert_eq!(task.status, TodoStatus::InProgress);
        assert_eq!(updated.summary().in_progress, 1);

        assert!(board.remove(&list.id).is_some());
        assert!(board.is_empty());
        assert!(matches!(board.update(&change), Err(TodoError::ListNotFound(_))));
    }
}
