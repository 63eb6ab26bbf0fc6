//! Task attachments — file references tied to a task.
//!
//! Only metadata is stored; the bytes live wherever `url` points.
//! Attachments are dropped with their task via the foreign key cascade.

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::task_store::{StoreError, TaskStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAttachment {
    pub id: String,
    pub task_id: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub url: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewAttachment {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub url: String,
}

impl TaskStore {
    pub fn add_attachment(
        &self,
        task_id: &str,
        new: NewAttachment,
    ) -> Result<TaskAttachment, StoreError> {
        // Surface a clean not-found instead of a bare FK violation
        self.get_task(task_id)?;

        let attachment = TaskAttachment {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            file_name: new.file_name,
            content_type: new.content_type,
            size_bytes: new.size_bytes,
            url: new.url,
            created_at: chrono::Utc::now().timestamp(),
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO task_attachments (id, task_id, file_name, content_type, size_bytes, url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                attachment.id,
                attachment.task_id,
                attachment.file_name,
                attachment.content_type,
                attachment.size_bytes,
                attachment.url,
                attachment.created_at,
            ],
        )?;
        Ok(attachment)
    }

    pub fn list_attachments(&self, task_id: &str) -> Result<Vec<TaskAttachment>, StoreError> {
        self.get_task(task_id)?;

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, task_id, file_name, content_type, size_bytes, url, created_at
             FROM task_attachments WHERE task_id = ?1 ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map(params![task_id], attachment_from_row)?;

        let mut attachments = Vec::new();
        for row in rows {
            attachments.push(row?);
        }
        Ok(attachments)
    }

    pub fn get_attachment(&self, id: &str) -> Result<TaskAttachment, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, task_id, file_name, content_type, size_bytes, url, created_at
             FROM task_attachments WHERE id = ?1",
            params![id],
            attachment_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn delete_attachment(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM task_attachments WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn attachment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskAttachment> {
    Ok(TaskAttachment {
        id: row.get(0)?,
        task_id: row.get(1)?,
        file_name: row.get(2)?,
        content_type: row.get(3)?,
        size_bytes: row.get(4)?,
        url: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;

    fn store_with_task() -> (TaskStore, String) {
        let store = TaskStore::new(":memory:").unwrap();
        let task = store
            .create_task(NewTask {
                title: "has files".into(),
                ..Default::default()
            })
            .unwrap();
        (store, task.id)
    }

    fn attachment(name: &str) -> NewAttachment {
        NewAttachment {
            file_name: name.into(),
            content_type: "text/plain".into(),
            size_bytes: 42,
            url: format!("https://files.example/{name}"),
        }
    }

    #[test]
    fn test_add_and_list() {
        let (store, task_id) = store_with_task();
        store.add_attachment(&task_id, attachment("notes.txt")).unwrap();
        store.add_attachment(&task_id, attachment("log.txt")).unwrap();

        let attachments = store.list_attachments(&task_id).unwrap();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].file_name, "notes.txt");
        assert_eq!(attachments[0].task_id, task_id);
    }

    #[test]
    fn test_add_to_missing_task() {
        let (store, _) = store_with_task();
        assert!(matches!(
            store.add_attachment("ghost", attachment("x.txt")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_missing_task() {
        let (store, _) = store_with_task();
        assert!(matches!(
            store.list_attachments("ghost"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_attachment() {
        let (store, task_id) = store_with_task();
        let stored = store.add_attachment(&task_id, attachment("tmp.bin")).unwrap();
        store.delete_attachment(&stored.id).unwrap();
        assert!(matches!(
            store.delete_attachment(&stored.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_deleting_task_cascades() {
        let (store, task_id) = store_with_task();
        let stored = store.add_attachment(&task_id, attachment("doomed.txt")).unwrap();

        store.delete_task(&task_id).unwrap();
        assert!(matches!(
            store.get_attachment(&stored.id),
            Err(StoreError::NotFound(_))
        ));
    }
}
