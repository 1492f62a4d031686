use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::{Task, TaskCategory, TaskWithCompletion};

/// `tasks` table row - category is stored as text
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub reward: i64,
    pub description: Option<String>,
    pub link: Option<String>,
    pub is_active: bool,
}

impl TryFrom<TaskRow> for Task {
    type Error = String;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let category: TaskCategory = row.category.parse()?;
        Ok(Task {
            id: row.id,
            name: row.name,
            category,
            reward: row.reward,
            description: row.description,
            link: row.link,
            is_active: row.is_active,
        })
    }
}

/// `tasks LEFT JOIN user_tasks` row
#[derive(Debug, Clone, FromRow)]
pub struct TaskCompletionRow {
    #[sqlx(flatten)]
    pub task: TaskRow,
    pub completed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TaskCompletionRow> for TaskWithCompletion {
    type Error = String;

    fn try_from(row: TaskCompletionRow) -> Result<Self, Self::Error> {
        Ok(TaskWithCompletion {
            task: Task::try_from(row.task)?,
            completed: row.completed.unwrap_or(false),
            completed_at: row.completed_at,
        })
    }
}
