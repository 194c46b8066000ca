//! Complexity assessment and TodoList bookkeeping for compound requests.

pub mod complexity;
pub mod todo;

pub use complexity::analyze_complexity;
pub use todo::{TodoBoard, TodoError, create_todo_list, decompose_intent, update_task};
