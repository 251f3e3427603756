use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{sort_newest_first, NewTask, Task, TaskPatch, User};
use super::{StoreError, UserStore};

/// In-memory store used by `AppState::fake()` and the handler tests.
/// The mutex makes create_user's uniqueness check atomic, so it gives the
/// same duplicate-email guarantee as the Postgres unique index.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&id).cloned())
    }

    async fn update_name(&self, id: Uuid, name: &str) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(StoreError::UserNotFound)?;
        user.name = name.to_string();
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(StoreError::UserNotFound)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        users.remove(&id).map(|_| ()).ok_or(StoreError::UserNotFound)
    }

    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let users = self.users.lock().unwrap();
        let user = users.get(&user_id).ok_or(StoreError::UserNotFound)?;
        Ok(sort_newest_first(&user.tasks))
    }

    async fn create_task(&self, user_id: Uuid, input: NewTask) -> Result<Task, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(StoreError::UserNotFound)?;
        let now = OffsetDateTime::now_utc();
        let task = input.into_task(now);
        user.tasks.push(task.clone());
        user.updated_at = now;
        Ok(task)
    }

    async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        patch: TaskPatch,
    ) -> Result<Task, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(StoreError::UserNotFound)?;
        let now = OffsetDateTime::now_utc();
        let task = user
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(StoreError::TaskNotFound)?;
        task.apply(patch, now);
        let task = task.clone();
        user.updated_at = now;
        Ok(task)
    }

    async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(StoreError::UserNotFound)?;
        let before = user.tasks.len();
        user.tasks.retain(|t| t.id != task_id);
        if user.tasks.len() == before {
            return Err(StoreError::TaskNotFound);
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStatus;

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            description: None,
            status: TaskStatus::Pending,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.create_user("Ann", "ann@x.com", "h1").await.unwrap();
        let err = store.create_user("Ann 2", "ann@x.com", "h2").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn deleting_user_removes_its_tasks() {
        let store = MemoryUserStore::new();
        let user = store.create_user("Ann", "ann@x.com", "h").await.unwrap();
        store.create_task(user.id, new_task("Buy milk")).await.unwrap();

        store.delete_user(user.id).await.unwrap();

        let err = store.list_tasks(user.id).await.unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound));
    }

    #[tokio::test]
    async fn tasks_listed_newest_first() {
        let store = MemoryUserStore::new();
        let user = store.create_user("Ann", "ann@x.com", "h").await.unwrap();
        for title in ["first", "second", "third"] {
            store.create_task(user.id, new_task(title)).await.unwrap();
        }

        let tasks = store.list_tasks(user.id).await.unwrap();
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn status_only_patch_keeps_other_fields() {
        let store = MemoryUserStore::new();
        let user = store.create_user("Ann", "ann@x.com", "h").await.unwrap();
        let task = store
            .create_task(
                user.id,
                NewTask {
                    title: "Buy milk".into(),
                    description: Some("2 liters".into()),
                    status: TaskStatus::Pending,
                    due_date: None,
                },
            )
            .await
            .unwrap();

        let updated = store
            .update_task(
                user.id,
                task.id,
                TaskPatch {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Buy milk");
        assert_eq!(updated.description.as_deref(), Some("2 liters"));
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn unknown_task_or_user_is_not_found() {
        let store = MemoryUserStore::new();
        let user = store.create_user("Ann", "ann@x.com", "h").await.unwrap();

        let err = store
            .update_task(user.id, Uuid::new_v4(), TaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound));

        let err = store
            .delete_task(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound));
    }
}
