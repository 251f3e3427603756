use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{sort_newest_first, NewTask, Task, TaskPatch, User};
use super::{StoreError, UserStore};

/// Postgres-backed store. Each user is one row with tasks embedded as a JSONB
/// array, so a user document (tasks included) is written as a single unit.
/// Concurrent task edits to the same user are last-write-wins.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let row: Option<Json<Vec<Task>>> =
            sqlx::query_scalar(r#"SELECT tasks FROM users WHERE id = $1"#)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .context("load tasks")?;
        row.map(|Json(tasks)| tasks).ok_or(StoreError::UserNotFound)
    }

    async fn save_tasks(&self, user_id: Uuid, tasks: &[Task]) -> Result<(), StoreError> {
        sqlx::query(r#"UPDATE users SET tasks = $2, updated_at = now() WHERE id = $1"#)
            .bind(user_id)
            .bind(Json(tasks))
            .execute(&self.pool)
            .await
            .context("save tasks")?;
        Ok(())
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    tasks: Json<Vec<Task>>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            name: r.name,
            email: r.email,
            password_hash: r.password_hash,
            tasks: r.tasks.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, tasks, created_at, updated_at";

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        // The unique index on email closes the duplicate-signup race.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
            _ => StoreError::Backend(anyhow::Error::new(e).context("create user")),
        })?;
        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE email = $1"#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("find user by email")?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find user by id")?;
        Ok(row.map(Into::into))
    }

    async fn update_name(&self, id: Uuid, name: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET name = $2, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("update user name")?;
        row.map(Into::into).ok_or(StoreError::UserNotFound)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1"#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .context("update user password")?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete user")?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound);
        }
        Ok(())
    }

    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let tasks = self.load_tasks(user_id).await?;
        Ok(sort_newest_first(&tasks))
    }

    async fn create_task(&self, user_id: Uuid, input: NewTask) -> Result<Task, StoreError> {
        let task = input.into_task(OffsetDateTime::now_utc());
        // Appending to the JSONB array is a single statement, so the document
        // update is atomic.
        let result = sqlx::query(
            r#"UPDATE users SET tasks = tasks || $2, updated_at = now() WHERE id = $1"#,
        )
        .bind(user_id)
        .bind(Json(&task))
        .execute(&self.pool)
        .await
        .context("create task")?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound);
        }
        Ok(task)
    }

    async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        patch: TaskPatch,
    ) -> Result<Task, StoreError> {
        let mut tasks = self.load_tasks(user_id).await?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(StoreError::TaskNotFound)?;
        task.apply(patch, OffsetDateTime::now_utc());
        let updated = task.clone();
        self.save_tasks(user_id, &tasks).await?;
        Ok(updated)
    }

    async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> Result<(), StoreError> {
        let mut tasks = self.load_tasks(user_id).await?;
        let before = tasks.len();
        tasks.retain(|t| t.id != task_id);
        if tasks.len() == before {
            return Err(StoreError::TaskNotFound);
        }
        self.save_tasks(user_id, &tasks).await
    }
}
