use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::store::{NewTask, Task, TaskPatch, TaskStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
}

impl CreateTaskRequest {
    pub fn into_new_task(self) -> NewTask {
        NewTask {
            title: self.title.trim().to_string(),
            description: self.description,
            status: self.status.unwrap_or_default(),
            due_date: self.due_date,
        }
    }
}

/// Partial update: a field changes iff its key is present in the payload.
/// `dueDate` distinguishes "absent" (keep) from explicit `null` (clear).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "present_due_date")]
    pub due_date: Option<Option<OffsetDateTime>>,
}

fn present_due_date<'de, D>(deserializer: D) -> Result<Option<Option<OffsetDateTime>>, D::Error>
where
    D: Deserializer<'de>,
{
    // Called only when the key is present; absent keys fall back to the
    // serde(default) of None.
    time::serde::rfc3339::option::deserialize(deserializer).map(Some)
}

impl UpdateTaskRequest {
    pub fn into_patch(self) -> TaskPatch {
        TaskPatch {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description,
            status: self.status,
            due_date: self.due_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskData {
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct TaskListData {
    pub tasks: Vec<Task>,
}
