use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTask {
    pub id: String,
    pub student_id: String,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskRequest {
    pub student_id: String,
    pub title: String,
    pub due_date: DateTime<Utc>,
}

/// Partial document written when a task is marked completed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletion {
    pub completed: bool,
    pub completed_at: DateTime<Utc>,
}

/// Lightweight task projection carried inside a day bucket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub student_id: String,
    pub completed: bool,
    pub due_date: DateTime<Utc>,
}

/// Per-day aggregation of task counts in a Monday-start week. Derived on
/// every call, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub day: String,
    pub date: String,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub completion_rate: u32,
    pub tasks: Vec<TaskSummary>,
}
