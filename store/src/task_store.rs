//! SQLite-backed task store.
//!
//! Single-writer access through a mutex-guarded connection; WAL mode for
//! concurrent readers from other processes.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

use crate::kanban::WipLimits;
use crate::task::{NewTask, Task, TaskFilter, TaskPriority, TaskStatus, TaskUpdate};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("column {column} is at its WIP limit ({limit})")]
    WipLimitReached { column: String, limit: usize },
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("metadata encoding error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("task store lock poisoned")]
    LockPoisoned,
}

/// SQLite task store
pub struct TaskStore {
    conn: Mutex<Connection>,
    wip_limits: WipLimits,
}

impl TaskStore {
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        Self::with_wip_limits(db_path, WipLimits::default())
    }

    pub fn with_wip_limits(db_path: &str, wip_limits: WipLimits) -> Result<Self, StoreError> {
        if db_path != ":memory:" {
            if let Some(parent) = std::path::Path::new(db_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                user_id TEXT,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                completed_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS environments (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                config TEXT NOT NULL DEFAULT '{}',
                user_id TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS task_attachments (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                file_name TEXT NOT NULL,
                content_type TEXT NOT NULL DEFAULT '',
                size_bytes INTEGER NOT NULL DEFAULT 0,
                url TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created_at);
            CREATE INDEX IF NOT EXISTS idx_environments_user ON environments(user_id);
            CREATE INDEX IF NOT EXISTS idx_attachments_task ON task_attachments(task_id);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            wip_limits,
        })
    }

    pub fn wip_limits(&self) -> &WipLimits {
        &self.wip_limits
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn create_task(&self, new: NewTask) -> Result<Task, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            status: new.status.unwrap_or(TaskStatus::Pending),
            priority: new.priority.unwrap_or(TaskPriority::Medium),
            user_id: new.user_id,
            metadata: new.metadata.unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
            updated_at: now,
            completed_at: if new.status == Some(TaskStatus::Completed) {
                Some(now)
            } else {
                None
            },
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (id, title, description, status, priority, user_id, metadata, created_at, updated_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                task.id,
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                task.user_id,
                serde_json::to_string(&task.metadata)?,
                task.created_at,
                task.updated_at,
                task.completed_at,
            ],
        )?;

        info!("Task created: {} ({})", task.id, task.title);
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> Result<Task, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, title, description, status, priority, user_id, metadata, created_at, updated_at, completed_at
             FROM tasks WHERE id = ?1",
            params![id],
            task_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Filtered, paginated listing; returns the page and the total match count
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<(Vec<Task>, i64), StoreError> {
        let conn = self.lock()?;

        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = filter.status {
            clauses.push("status = ?");
            args.push(status.as_str().to_string());
        }
        if let Some(priority) = filter.priority {
            clauses.push("priority = ?");
            args.push(priority.as_str().to_string());
        }
        if let Some(user_id) = &filter.user_id {
            clauses.push("user_id = ?");
            args.push(user_id.clone());
        }
        if let Some(needle) = &filter.title_contains {
            clauses.push("title LIKE ?");
            args.push(format!("%{needle}%"));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM tasks{where_sql}"),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let limit = if filter.limit <= 0 { 50 } else { filter.limit };
        let offset = filter.offset.max(0);

        let sql = format!(
            "SELECT id, title, description, status, priority, user_id, metadata, created_at, updated_at, completed_at
             FROM tasks{where_sql} ORDER BY created_at DESC, id LIMIT {limit} OFFSET {offset}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), task_from_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok((tasks, total))
    }

    pub fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task, StoreError> {
        let mut task = self.get_task(id)?;
        let now = chrono::Utc::now().timestamp();
        let previous_status = task.status;

        if let Some(title) = update.title {
            task.title = title;
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(metadata) = update.metadata {
            task.metadata = metadata;
        }
        if let Some(status) = update.status {
            task.status = status;
        }

        // completed_at tracks status transitions into and out of completed
        if task.status == TaskStatus::Completed {
            if previous_status != TaskStatus::Completed {
                task.completed_at = Some(now);
            }
        } else {
            task.completed_at = None;
        }
        task.updated_at = now;

        self.persist(&task)?;
        Ok(task)
    }

    pub fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        info!("Task deleted: {id}");
        Ok(())
    }

    pub fn count_by_status(&self, status: TaskStatus) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Write a full task row back; used by updates and kanban moves
    pub(crate) fn persist(&self, task: &Task) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE tasks SET title = ?2, description = ?3, status = ?4, priority = ?5,
                    user_id = ?6, metadata = ?7, updated_at = ?8, completed_at = ?9
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                task.user_id,
                serde_json::to_string(&task.metadata)?,
                task.updated_at,
                task.completed_at,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(task.id.clone()));
        }
        Ok(())
    }
}

pub(crate) fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let status_raw: String = row.get(3)?;
    let priority_raw: String = row.get(4)?;
    let metadata_raw: String = row.get(6)?;

    let status = TaskStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown status {status_raw:?}").into(),
        )
    })?;
    let priority = TaskPriority::parse(&priority_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown priority {priority_raw:?}").into(),
        )
    })?;
    let metadata = serde_json::from_str(&metadata_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status,
        priority,
        user_id: row.get(5)?,
        metadata,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        completed_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TaskStore {
        TaskStore::new(":memory:").unwrap()
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_defaults() {
        let store = store();
        let task = store.create_task(new_task("write docs")).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.metadata, serde_json::json!({}));
        assert!(task.completed_at.is_none());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_create_and_get_round_trip() {
        let store = store();
        let created = store
            .create_task(NewTask {
                title: "ship feature".into(),
                description: "the big one".into(),
                priority: Some(TaskPriority::High),
                user_id: Some("user-1".into()),
                metadata: Some(serde_json::json!({"labels": ["backend"]})),
                ..Default::default()
            })
            .unwrap();

        let fetched = store.get_task(&created.id).unwrap();
        assert_eq!(fetched.title, "ship feature");
        assert_eq!(fetched.priority, TaskPriority::High);
        assert_eq!(fetched.user_id.as_deref(), Some("user-1"));
        assert_eq!(fetched.metadata["labels"][0], "backend");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = store();
        match store.get_task("nope") {
            Err(StoreError::NotFound(id)) => assert_eq!(id, "nope"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_update_sets_completed_at() {
        let store = store();
        let task = store.create_task(new_task("finish me")).unwrap();

        let done = store
            .update_task(
                &task.id,
                TaskUpdate {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(done.completed_at.is_some());

        // Leaving completed clears the stamp
        let reopened = store
            .update_task(
                &task.id,
                TaskUpdate {
                    status: Some(TaskStatus::InProgress),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(reopened.completed_at.is_none());
        assert_eq!(reopened.status, TaskStatus::InProgress);
    }

    #[test]
    fn test_update_partial_leaves_other_fields() {
        let store = store();
        let task = store
            .create_task(NewTask {
                title: "original".into(),
                description: "keep me".into(),
                ..Default::default()
            })
            .unwrap();

        let updated = store
            .update_task(
                &task.id,
                TaskUpdate {
                    title: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.description, "keep me");
        assert_eq!(updated.status, TaskStatus::Pending);
        assert!(updated.updated_at >= updated.created_at);
    }

    #[test]
    fn test_delete() {
        let store = store();
        let task = store.create_task(new_task("ephemeral")).unwrap();
        store.delete_task(&task.id).unwrap();
        assert!(matches!(
            store.get_task(&task.id),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_task(&task.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_filters_by_status_and_user() {
        let store = store();
        for i in 0..3 {
            store
                .create_task(NewTask {
                    title: format!("task {i}"),
                    status: Some(TaskStatus::InProgress),
                    user_id: Some("alice".into()),
                    ..Default::default()
                })
                .unwrap();
        }
        store
            .create_task(NewTask {
                title: "other".into(),
                user_id: Some("bob".into()),
                ..Default::default()
            })
            .unwrap();

        let (tasks, total) = store
            .list_tasks(&TaskFilter {
                status: Some(TaskStatus::InProgress),
                user_id: Some("alice".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 3);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::InProgress));
    }

    #[test]
    fn test_list_title_search() {
        let store = store();
        store.create_task(new_task("fix login bug")).unwrap();
        store.create_task(new_task("write changelog")).unwrap();

        let (tasks, total) = store
            .list_tasks(&TaskFilter {
                title_contains: Some("login".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(tasks[0].title, "fix login bug");
    }

    #[test]
    fn test_list_pagination() {
        let store = store();
        for i in 0..10 {
            store.create_task(new_task(&format!("task {i}"))).unwrap();
        }

        let (page, total) = store
            .list_tasks(&TaskFilter {
                limit: 4,
                offset: 8,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 10);
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_count_by_status() {
        let store = store();
        store
            .create_task(NewTask {
                title: "a".into(),
                status: Some(TaskStatus::Review),
                ..Default::default()
            })
            .unwrap();
        store.create_task(new_task("b")).unwrap();

        assert_eq!(store.count_by_status(TaskStatus::Review).unwrap(), 1);
        assert_eq!(store.count_by_status(TaskStatus::Pending).unwrap(), 1);
        assert_eq!(store.count_by_status(TaskStatus::Blocked).unwrap(), 0);
    }

    #[test]
    fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let path = path.to_str().unwrap();

        let id = {
            let store = TaskStore::new(path).unwrap();
            store.create_task(new_task("durable")).unwrap().id
        };

        let store = TaskStore::new(path).unwrap();
        assert_eq!(store.get_task(&id).unwrap().title, "durable");
    }

    #[test]
    fn test_metadata_round_trip_is_exact() {
        let store = store();
        let metadata = serde_json::json!({
            "nested": {"a": [1, 2, 3], "b": null},
            "flag": true,
        });
        let task = store
            .create_task(NewTask {
                title: "meta".into(),
                metadata: Some(metadata.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(store.get_task(&task.id).unwrap().metadata, metadata);
    }
}
