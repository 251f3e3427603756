use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

/// Task subdocument, embedded in its owning user. Serialized both to the API
/// (camelCase, RFC 3339 dates) and into the user's JSONB column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// User aggregate. Tasks have no identity outside their owner; deleting the
/// user deletes them with it.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub tasks: Vec<Task>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated input for creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<OffsetDateTime>,
}

impl NewTask {
    pub fn into_task(self, now: OffsetDateTime) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            status: self.status,
            due_date: self.due_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update: a field changes iff it was present in the payload.
/// `due_date` is doubly optional so an explicit `null` clears the date while
/// an absent key leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<OffsetDateTime>>,
}

impl Task {
    pub fn apply(&mut self, patch: TaskPatch, now: OffsetDateTime) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        self.updated_at = now;
    }
}

/// Newest-created-first, with a stable tie-break on insertion order
/// (later-appended tasks come first).
pub fn sort_newest_first(tasks: &[Task]) -> Vec<Task> {
    let mut out: Vec<Task> = tasks.iter().rev().cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn task(title: &str, created_at: OffsetDateTime) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            status: TaskStatus::Pending,
            due_date: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn apply_changes_only_present_fields() {
        let now = OffsetDateTime::now_utc();
        let mut t = task("Buy milk", now);
        t.description = Some("2 liters".into());
        t.due_date = Some(now + Duration::days(1));

        t.apply(
            TaskPatch {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
            now + Duration::minutes(5),
        );

        assert_eq!(t.title, "Buy milk");
        assert_eq!(t.description.as_deref(), Some("2 liters"));
        assert_eq!(t.status, TaskStatus::Completed);
        assert!(t.due_date.is_some());
        assert_eq!(t.updated_at, now + Duration::minutes(5));
    }

    #[test]
    fn apply_clears_due_date_on_explicit_null() {
        let now = OffsetDateTime::now_utc();
        let mut t = task("Buy milk", now);
        t.due_date = Some(now);

        t.apply(
            TaskPatch {
                due_date: Some(None),
                ..Default::default()
            },
            now,
        );
        assert!(t.due_date.is_none());
    }

    #[test]
    fn apply_allows_empty_description() {
        let now = OffsetDateTime::now_utc();
        let mut t = task("Buy milk", now);
        t.description = Some("old".into());

        t.apply(
            TaskPatch {
                description: Some(String::new()),
                ..Default::default()
            },
            now,
        );
        assert_eq!(t.description.as_deref(), Some(""));
    }

    #[test]
    fn sort_is_newest_first() {
        let now = OffsetDateTime::now_utc();
        let tasks = vec![
            task("oldest", now - Duration::hours(2)),
            task("middle", now - Duration::hours(1)),
            task("newest", now),
        ];
        let sorted = sort_newest_first(&tasks);
        let titles: Vec<_> = sorted.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["newest", "middle", "oldest"]);
    }

    #[test]
    fn sort_breaks_ties_by_insertion_order() {
        let now = OffsetDateTime::now_utc();
        let tasks = vec![task("first", now), task("second", now)];
        let sorted = sort_newest_first(&tasks);
        assert_eq!(sorted[0].title, "second");
    }

    #[test]
    fn task_serializes_camel_case_rfc3339() {
        let now = time::macros::datetime!(2024-05-01 12:00:00 UTC);
        let t = task("Buy milk", now);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["createdAt"], "2024-05-01T12:00:00Z");
        assert!(json["dueDate"].is_null());
    }
}
