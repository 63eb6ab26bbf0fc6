//! VibeX task storage — task records, SQLite-backed store, kanban board logic.

pub mod attachment;
pub mod environment;
pub mod kanban;
pub mod task;
pub mod task_store;

pub use attachment::{NewAttachment, TaskAttachment};
pub use environment::{Environment, EnvironmentUpdate, NewEnvironment};
pub use kanban::{Board, BoardColumn, KanbanColumn, WipLimits};
pub use task::{ColumnMove, NewTask, Task, TaskFilter, TaskPriority, TaskStatus, TaskUpdate};
pub use task_store::{StoreError, TaskStore};
