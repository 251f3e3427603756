use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;
pub mod types;

pub use types::{NewTask, Task, TaskPatch, TaskStatus, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user not found")]
    UserNotFound,
    #[error("task not found")]
    TaskNotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Document-store collaborator owning the User aggregate (tasks embedded).
/// Each user document is read-modify-written as one unit; email uniqueness is
/// enforced by the store itself at write time.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn update_name(&self, id: Uuid, name: &str) -> Result<User, StoreError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;

    /// Deletes the user document; embedded tasks go with it.
    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;

    /// Tasks ordered newest-created-first.
    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError>;

    async fn create_task(&self, user_id: Uuid, input: NewTask) -> Result<Task, StoreError>;

    async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        patch: TaskPatch,
    ) -> Result<Task, StoreError>;

    async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> Result<(), StoreError>;
}
