//! Task storage, always scoped to the owning user.

use sqlx::sqlite::SqlitePool;

use crate::model::{Task, TaskStatus};

#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

/// Optional filters for listing and counting tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    /// Substring match on the title
    pub search: Option<String>,
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    user_id: String,
    title: String,
    description: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = sqlx::Error;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<TaskStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user_id: row.user_id,
        })
    }
}

const TASK_COLUMNS: &str = "id, user_id, title, description, status, created_at, updated_at";

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new open task and return it.
    pub async fn create(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO tasks (id, user_id, title, description) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(user_id)
            .bind(title)
            .bind(description)
            .execute(&self.pool)
            .await?;

        self.get(&id, user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Get a task by ID. Only returns the task if it belongs to the given user.
    pub async fn get(&self, id: &str, user_id: &str) -> Result<Option<Task>, sqlx::Error> {
        let row: Option<TaskRow> = sqlx::query_as(sqlx::AssertSqlSafe(format!(
            "SELECT {} FROM tasks WHERE id = ? AND user_id = ?",
            TASK_COLUMNS
        )))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Task::try_from).transpose()
    }

    /// List a page of tasks for a user, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        filter: &TaskFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let rows: Vec<TaskRow> = sqlx::query_as(sqlx::AssertSqlSafe(format!(
            "SELECT {} FROM tasks
             WHERE user_id = ?1
               AND (?2 IS NULL OR status = ?2)
               AND (?3 IS NULL OR instr(title, ?3) > 0)
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?4 OFFSET ?5",
            TASK_COLUMNS
        )))
        .bind(user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.search.as_deref())
        .bind(i64::from(limit))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Task::try_from).collect()
    }

    /// Count tasks for a user matching the filter.
    pub async fn count(&self, user_id: &str, filter: &TaskFilter) -> Result<u64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tasks
             WHERE user_id = ?1
               AND (?2 IS NULL OR status = ?2)
               AND (?3 IS NULL OR instr(title, ?3) > 0)",
        )
        .bind(user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.search.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(count.0).unwrap_or(0))
    }

    /// Overwrite a task's editable fields. Returns the updated task, or None
    /// if it does not exist for this user.
    pub async fn update(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        description: Option<&str>,
        status: TaskStatus,
    ) -> Result<Option<Task>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks
             SET title = ?, description = ?, status = ?,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ? AND user_id = ?",
        )
        .bind(title)
        .bind(description)
        .bind(status.as_str())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id, user_id).await
    }

    /// Flip OPEN <-> DONE atomically. Returns the updated task.
    pub async fn toggle_status(&self, id: &str, user_id: &str) -> Result<Option<Task>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks
             SET status = CASE status WHEN 'OPEN' THEN 'DONE' ELSE 'OPEN' END,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id, user_id).await
    }

    /// Delete a task. Only deletes if the task belongs to the given user.
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
