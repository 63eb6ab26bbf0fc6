//! Kanban board view and move validation.
//!
//! Columns map onto task statuses through a fixed table; `in_progress` and
//! `review` carry WIP limits enforced at move time.

use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::task::{ColumnMove, Task, TaskStatus};
use crate::task_store::{task_from_row, StoreError, TaskStore};

/// Workflow buckets shown on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KanbanColumn {
    Todo,
    InProgress,
    Review,
    Completed,
}

impl KanbanColumn {
    pub const ALL: [KanbanColumn; 4] = [
        KanbanColumn::Todo,
        KanbanColumn::InProgress,
        KanbanColumn::Review,
        KanbanColumn::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KanbanColumn::Todo => "todo",
            KanbanColumn::InProgress => "in_progress",
            KanbanColumn::Review => "review",
            KanbanColumn::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(KanbanColumn::Todo),
            "in_progress" => Some(KanbanColumn::InProgress),
            "review" => Some(KanbanColumn::Review),
            "completed" => Some(KanbanColumn::Completed),
            _ => None,
        }
    }

    /// Status a task takes when moved into this column
    pub fn status(&self) -> TaskStatus {
        match self {
            KanbanColumn::Todo => TaskStatus::Pending,
            KanbanColumn::InProgress => TaskStatus::InProgress,
            KanbanColumn::Review => TaskStatus::Review,
            KanbanColumn::Completed => TaskStatus::Completed,
        }
    }

    /// Column a task with the given status is displayed in.
    /// Blocked tasks sit in the todo column; the mapping back never
    /// produces blocked.
    pub fn for_status(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending | TaskStatus::Blocked => KanbanColumn::Todo,
            TaskStatus::InProgress => KanbanColumn::InProgress,
            TaskStatus::Review => KanbanColumn::Review,
            TaskStatus::Completed => KanbanColumn::Completed,
        }
    }
}

/// Per-column caps on concurrent tasks
#[derive(Debug, Clone, Copy)]
pub struct WipLimits {
    pub in_progress: usize,
    pub review: usize,
}

impl Default for WipLimits {
    fn default() -> Self {
        Self {
            in_progress: 5,
            review: 3,
        }
    }
}

impl WipLimits {
    pub fn limit_for(&self, column: KanbanColumn) -> Option<usize> {
        match column {
            KanbanColumn::InProgress => Some(self.in_progress),
            KanbanColumn::Review => Some(self.review),
            KanbanColumn::Todo | KanbanColumn::Completed => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BoardColumn {
    pub column: KanbanColumn,
    pub tasks: Vec<Task>,
    pub count: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct Board {
    pub columns: Vec<BoardColumn>,
}

impl TaskStore {
    /// All tasks grouped per column, with counts and limits
    pub fn board(&self, user_id: Option<&str>) -> Result<Board, StoreError> {
        let rows = {
            let conn = self.lock()?;
            let (where_sql, args) = match user_id {
                Some(user) => (" WHERE user_id = ?", vec![user.to_string()]),
                None => ("", Vec::new()),
            };
            let sql = format!(
                "SELECT id, title, description, status, priority, user_id, metadata, created_at, updated_at, completed_at
                 FROM tasks{where_sql} ORDER BY created_at DESC, id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map(params_from_iter(args.iter()), task_from_row)?;
            let mut rows = Vec::new();
            for row in mapped {
                rows.push(row?);
            }
            rows
        };

        let mut columns: Vec<BoardColumn> = KanbanColumn::ALL
            .iter()
            .map(|&column| BoardColumn {
                column,
                tasks: Vec::new(),
                count: 0,
                limit: self.wip_limits().limit_for(column),
            })
            .collect();

        for task in rows {
            let column = KanbanColumn::for_status(task.status);
            if let Some(slot) = columns.iter_mut().find(|c| c.column == column) {
                slot.tasks.push(task);
            }
        }
        for column in &mut columns {
            column.count = column.tasks.len();
        }

        Ok(Board { columns })
    }

    /// Move a task to another column, enforcing WIP limits and recording
    /// the move in `metadata.kanban.column_history`.
    pub fn move_task(
        &self,
        id: &str,
        target: KanbanColumn,
        moved_by: &str,
        position: Option<i64>,
    ) -> Result<Task, StoreError> {
        let mut task = self.get_task(id)?;
        let now = chrono::Utc::now().timestamp();
        let from = KanbanColumn::for_status(task.status);

        // Moves within the same column are exempt from the WIP guard,
        // otherwise a full column could never be reordered.
        if target != from {
            if let Some(limit) = self.wip_limits().limit_for(target) {
                let occupied = self.count_by_status(target.status())? as usize;
                if occupied >= limit {
                    return Err(StoreError::WipLimitReached {
                        column: target.as_str().to_string(),
                        limit,
                    });
                }
            }
            task.status = target.status();
        }

        if task.status == TaskStatus::Completed {
            if task.completed_at.is_none() {
                task.completed_at = Some(now);
            }
        } else {
            task.completed_at = None;
        }

        append_move_history(
            &mut task.metadata,
            ColumnMove {
                from: from.as_str().to_string(),
                to: target.as_str().to_string(),
                timestamp: now,
                moved_by: moved_by.to_string(),
            },
            position,
        );
        task.updated_at = now;

        self.persist(&task)?;
        info!(
            "Task {} moved {} -> {} by {moved_by}",
            task.id,
            from.as_str(),
            target.as_str()
        );
        Ok(task)
    }
}

fn append_move_history(metadata: &mut serde_json::Value, record: ColumnMove, position: Option<i64>) {
    if !metadata.is_object() {
        *metadata = serde_json::json!({});
    }
    let Some(root) = metadata.as_object_mut() else {
        return;
    };

    let kanban = root
        .entry("kanban")
        .or_insert_with(|| serde_json::json!({}));
    if !kanban.is_object() {
        *kanban = serde_json::json!({});
    }
    let Some(kanban) = kanban.as_object_mut() else {
        return;
    };

    let entry = serde_json::to_value(&record).unwrap_or(serde_json::Value::Null);
    match kanban
        .entry("column_history")
        .or_insert_with(|| serde_json::json!([]))
    {
        serde_json::Value::Array(history) => history.push(entry),
        other => *other = serde_json::json!([entry]),
    }

    if let Some(position) = position {
        kanban.insert("position".to_string(), serde_json::json!(position));
    }
}
