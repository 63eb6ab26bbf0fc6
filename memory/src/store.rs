//! SQLite-backed agent memory store.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

use crate::embedding::{cosine_similarity, embed, from_blob, to_blob};

const MIN_IMPORTANCE: i64 = 1;
const MAX_IMPORTANCE: i64 = 10;
const DEFAULT_IMPORTANCE: i64 = 5;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("metadata encoding error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("memory store lock poisoned")]
    LockPoisoned,
}

/// A stored note belonging to an agent type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMemory {
    pub id: String,
    pub agent_type: String,
    pub context_key: String,
    pub content: String,
    pub importance: i64,
    pub metadata: serde_json::Value,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub created_at: i64,
    pub last_accessed: i64,
    pub access_count: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewMemory {
    pub agent_type: String,
    pub context_key: String,
    pub content: String,
    pub importance: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

/// Expiry thresholds; an entry is archived only when it fails all three
#[derive(Debug, Clone, Copy)]
pub struct ArchivePolicy {
    pub max_age_days: i64,
    pub max_importance: i64,
    pub max_access_count: i64,
}

impl Default for ArchivePolicy {
    fn default() -> Self {
        Self {
            max_age_days: 90,
            max_importance: 3,
            max_access_count: 2,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemorySearchResult {
    #[serde(flatten)]
    pub memory: AgentMemory,
    pub similarity: f32,
}

/// SQLite memory store; one row per (agent_type, context_key)
pub struct MemoryStore {
    conn: Mutex<Connection>,
}

impl MemoryStore {
    pub fn new(db_path: &str) -> Result<Self, MemoryError> {
        if db_path != ":memory:" {
            if let Some(parent) = std::path::Path::new(db_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS agent_memories (
                id TEXT PRIMARY KEY,
                agent_type TEXT NOT NULL,
                context_key TEXT NOT NULL,
                content TEXT NOT NULL,
                importance INTEGER NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                last_accessed INTEGER NOT NULL,
                access_count INTEGER NOT NULL DEFAULT 0,
                UNIQUE(agent_type, context_key)
            );

            CREATE INDEX IF NOT EXISTS idx_memories_agent ON agent_memories(agent_type);
            CREATE INDEX IF NOT EXISTS idx_memories_created ON agent_memories(created_at);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, MemoryError> {
        self.conn.lock().map_err(|_| MemoryError::LockPoisoned)
    }

    /// Store a note, upserting on (agent_type, context_key).
    /// An existing entry keeps its id, created_at and access_count.
    pub fn store(&self, new: NewMemory) -> Result<AgentMemory, MemoryError> {
        let now = chrono::Utc::now().timestamp();
        let importance = new
            .importance
            .unwrap_or(DEFAULT_IMPORTANCE)
            .clamp(MIN_IMPORTANCE, MAX_IMPORTANCE);
        let metadata = new.metadata.unwrap_or_else(|| serde_json::json!({}));
        let embedding = embed(&new.content);

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO agent_memories (id, agent_type, context_key, content, importance, metadata, embedding, created_at, last_accessed, access_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)
             ON CONFLICT(agent_type, context_key) DO UPDATE SET
               content = excluded.content,
               importance = excluded.importance,
               metadata = excluded.metadata,
               embedding = excluded.embedding,
               last_accessed = excluded.last_accessed",
            params![
                uuid::Uuid::new_v4().to_string(),
                new.agent_type,
                new.context_key,
                new.content,
                importance,
                serde_json::to_string(&metadata)?,
                to_blob(&embedding),
                now,
                now,
            ],
        )?;

        let stored = conn
            .query_row(
                "SELECT id, agent_type, context_key, content, importance, metadata, embedding, created_at, last_accessed, access_count
                 FROM agent_memories WHERE agent_type = ?1 AND context_key = ?2",
                params![new.agent_type, new.context_key],
                memory_from_row,
            )
            .optional()?
            .ok_or_else(|| MemoryError::NotFound(key_label(&new.agent_type, &new.context_key)))?;

        info!(
            "Memory stored: {}/{} (importance {importance})",
            stored.agent_type, stored.context_key
        );
        Ok(stored)
    }

    /// Fetch by key, bumping access_count and last_accessed
    pub fn get(&self, agent_type: &str, context_key: &str) -> Result<AgentMemory, MemoryError> {
        let now = chrono::Utc::now().timestamp();
        let conn = self.lock()?;

        let touched = conn.execute(
            "UPDATE agent_memories SET access_count = access_count + 1, last_accessed = ?3
             WHERE agent_type = ?1 AND context_key = ?2",
            params![agent_type, context_key, now],
        )?;
        if touched == 0 {
            return Err(MemoryError::NotFound(key_label(agent_type, context_key)));
        }

        let memory = conn.query_row(
            "SELECT id, agent_type, context_key, content, importance, metadata, embedding, created_at, last_accessed, access_count
             FROM agent_memories WHERE agent_type = ?1 AND context_key = ?2",
            params![agent_type, context_key],
            memory_from_row,
        )?;
        Ok(memory)
    }

    pub fn list(
        &self,
        agent_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AgentMemory>, i64), MemoryError> {
        let conn = self.lock()?;
        let (where_sql, args) = match agent_type {
            Some(agent) => (" WHERE agent_type = ?", vec![agent.to_string()]),
            None => ("", Vec::new()),
        };

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM agent_memories{where_sql}"),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let limit = if limit <= 0 { 50 } else { limit };
        let offset = offset.max(0);
        let sql = format!(
            "SELECT id, agent_type, context_key, content, importance, metadata, embedding, created_at, last_accessed, access_count
             FROM agent_memories{where_sql} ORDER BY created_at DESC, id LIMIT {limit} OFFSET {offset}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), memory_from_row)?;

        let mut memories = Vec::new();
        for row in rows {
            memories.push(row?);
        }
        Ok((memories, total))
    }

    /// Rank stored notes by cosine similarity against the query text
    pub fn search(
        &self,
        query: &str,
        agent_type: Option<&str>,
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<MemorySearchResult>, MemoryError> {
        let query_embedding = embed(query);
        let (candidates, _) = self.list(agent_type, i64::MAX - 1, 0)?;

        let mut results: Vec<MemorySearchResult> = candidates
            .into_iter()
            .map(|memory| {
                let similarity = cosine_similarity(&query_embedding, &memory.embedding);
                MemorySearchResult { memory, similarity }
            })
            .filter(|r| r.similarity >= min_similarity)
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let limit = if limit == 0 { 10 } else { limit };
        results.truncate(limit);
        Ok(results)
    }

    /// Delete entries older than the policy age whose importance and
    /// access count are both at or below the policy thresholds.
    /// Returns the number of entries removed.
    pub fn archive(&self, policy: &ArchivePolicy) -> Result<usize, MemoryError> {
        let cutoff = chrono::Utc::now().timestamp() - policy.max_age_days * 86_400;
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM agent_memories
             WHERE created_at < ?1 AND importance <= ?2 AND access_count <= ?3",
            params![cutoff, policy.max_importance, policy.max_access_count],
        )?;
        if removed > 0 {
            info!(
                "Archived {removed} memories (age > {}d, importance <= {}, accesses <= {})",
                policy.max_age_days, policy.max_importance, policy.max_access_count
            );
        }
        Ok(removed)
    }

    pub fn delete(&self, id: &str) -> Result<(), MemoryError> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM agent_memories WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(MemoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn count(&self) -> Result<i64, MemoryError> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM agent_memories", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn key_label(agent_type: &str, context_key: &str) -> String {
    format!("{agent_type}/{context_key}")
}

fn memory_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentMemory> {
    let metadata_raw: String = row.get(5)?;
    let metadata = serde_json::from_str(&metadata_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let embedding_blob: Vec<u8> = row.get(6)?;

    Ok(AgentMemory {
        id: row.get(0)?,
        agent_type: row.get(1)?,
        context_key: row.get(2)?,
        content: row.get(3)?,
        importance: row.get(4)?,
        metadata,
        embedding: from_blob(&embedding_blob),
        created_at: row.get(7)?,
        last_accessed: row.get(8)?,
        access_count: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(":memory:").unwrap()
    }

    fn note(agent: &str, key: &str, content: &str) -> NewMemory {
        NewMemory {
            agent_type: agent.into(),
            context_key: key.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Backdate a row so archival tests can cross the age threshold
    fn backdate(store: &MemoryStore, id: &str, days: i64) {
        let created = chrono::Utc::now().timestamp() - days * 86_400;
        let conn = store.conn.lock().unwrap();
        conn.execute(
            "UPDATE agent_memories SET created_at = ?2 WHERE id = ?1",
            params![id, created],
        )
        .unwrap();
    }

    #[test]
    fn test_store_and_get() {
        let store = store();
        let stored = store
            .store(note("code-reviewer", "style-prefs", "prefers small focused diffs"))
            .unwrap();
        assert_eq!(stored.importance, DEFAULT_IMPORTANCE);
        assert_eq!(stored.access_count, 0);

        let fetched = store.get("code-reviewer", "style-prefs").unwrap();
        assert_eq!(fetched.id, stored.id);
        assert_eq!(fetched.content, "prefers small focused diffs");
        assert_eq!(fetched.access_count, 1);
        assert!(fetched.last_accessed >= stored.last_accessed);
    }

    #[test]
    fn test_get_missing() {
        let store = store();
        assert!(matches!(
            store.get("planner", "nothing"),
            Err(MemoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_access_count_accumulates() {
        let store = store();
        store.store(note("planner", "k", "v")).unwrap();
        for _ in 0..3 {
            store.get("planner", "k").unwrap();
        }
        assert_eq!(store.get("planner", "k").unwrap().access_count, 4);
    }

    #[test]
    fn test_upsert_keeps_identity() {
        let store = store();
        let first = store.store(note("planner", "k", "old content")).unwrap();
        store.get("planner", "k").unwrap();

        let second = store
            .store(NewMemory {
                importance: Some(9),
                ..note("planner", "k", "new content")
            })
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.content, "new content");
        assert_eq!(second.importance, 9);
        // access_count survives the rewrite
        assert_eq!(second.access_count, 1);
    }

    #[test]
    fn test_importance_is_clamped() {
        let store = store();
        let low = store
            .store(NewMemory {
                importance: Some(-4),
                ..note("a", "low", "x")
            })
            .unwrap();
        assert_eq!(low.importance, 1);

        let high = store
            .store(NewMemory {
                importance: Some(99),
                ..note("a", "high", "x")
            })
            .unwrap();
        assert_eq!(high.importance, 10);
    }

    #[test]
    fn test_list_filters_by_agent_type() {
        let store = store();
        store.store(note("planner", "a", "one")).unwrap();
        store.store(note("planner", "b", "two")).unwrap();
        store.store(note("reviewer", "c", "three")).unwrap();

        let (memories, total) = store.list(Some("planner"), 10, 0).unwrap();
        assert_eq!(total, 2);
        assert!(memories.iter().all(|m| m.agent_type == "planner"));

        let (_, all) = store.list(None, 10, 0).unwrap();
        assert_eq!(all, 3);
    }

    #[test]
    fn test_search_ranks_related_content_first() {
        let store = store();
        store
            .store(note("planner", "db", "postgres connection pool exhausted under load"))
            .unwrap();
        store
            .store(note("planner", "ui", "button colors for the settings page"))
            .unwrap();

        let results = store
            .search("connection pool tuning", Some("planner"), 10, 0.0)
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].memory.context_key, "db");
        if results.len() > 1 {
            assert!(results[0].similarity >= results[1].similarity);
        }
    }

    #[test]
    fn test_search_respects_agent_filter() {
        let store = store();
        store.store(note("planner", "k", "deploy checklist")).unwrap();
        store.store(note("reviewer", "k", "deploy checklist")).unwrap();

        let results = store.search("deploy", Some("reviewer"), 10, 0.0).unwrap();
        assert!(results.iter().all(|r| r.memory.agent_type == "reviewer"));
    }

    #[test]
    fn test_search_min_similarity_filters() {
        let store = store();
        store.store(note("planner", "k", "kubernetes ingress rules")).unwrap();

        let strict = store.search("completely unrelated words qzx", None, 10, 0.9).unwrap();
        assert!(strict.is_empty());

        let exact = store.search("kubernetes ingress rules", None, 10, 0.9).unwrap();
        assert_eq!(exact.len(), 1);
    }

    #[test]
    fn test_archive_removes_only_stale_unimportant_unread() {
        let store = store();
        let stale = store
            .store(NewMemory {
                importance: Some(2),
                ..note("planner", "stale", "old scratch note")
            })
            .unwrap();
        backdate(&store, &stale.id, 120);

        // Old but important
        let keeper_importance = store
            .store(NewMemory {
                importance: Some(8),
                ..note("planner", "important", "production runbook")
            })
            .unwrap();
        backdate(&store, &keeper_importance.id, 120);

        // Old and unimportant but frequently read
        let keeper_reads = store
            .store(NewMemory {
                importance: Some(2),
                ..note("planner", "popular", "often consulted")
            })
            .unwrap();
        backdate(&store, &keeper_reads.id, 120);
        for _ in 0..3 {
            store.get("planner", "popular").unwrap();
        }

        // Recent and unimportant
        store
            .store(NewMemory {
                importance: Some(1),
                ..note("planner", "fresh", "new scratch note")
            })
            .unwrap();

        let removed = store.archive(&ArchivePolicy::default()).unwrap();
        assert_eq!(removed, 1);
        assert!(store.get("planner", "stale").is_err());
        assert!(store.get("planner", "important").is_ok());
        assert!(store.get("planner", "popular").is_ok());
        assert!(store.get("planner", "fresh").is_ok());
    }

    #[test]
    fn test_archive_custom_thresholds() {
        let store = store();
        let entry = store
            .store(NewMemory {
                importance: Some(5),
                ..note("planner", "k", "note")
            })
            .unwrap();
        backdate(&store, &entry.id, 10);

        let removed = store
            .archive(&ArchivePolicy {
                max_age_days: 7,
                max_importance: 5,
                max_access_count: 0,
            })
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_delete_by_id() {
        let store = store();
        let entry = store.store(note("planner", "k", "bye")).unwrap();
        store.delete(&entry.id).unwrap();
        assert!(matches!(store.delete(&entry.id), Err(MemoryError::NotFound(_))));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_embedding_survives_storage() {
        let store = store();
        let stored = store.store(note("planner", "k", "vector round trip")).unwrap();
        assert_eq!(stored.embedding, crate::embedding::embed("vector round trip"));
    }

    #[test]
    fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.db");
        let path = path.to_str().unwrap();

        {
            let store = MemoryStore::new(path).unwrap();
            store.store(note("planner", "k", "durable note")).unwrap();
        }
        let store = MemoryStore::new(path).unwrap();
        assert_eq!(store.get("planner", "k").unwrap().content, "durable note");
    }
}
