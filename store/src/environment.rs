//! Environment records — named configuration profiles tasks can run against.

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::task_store::{StoreError, TaskStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
    pub description: String,
    pub config: serde_json::Value,
    pub user_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewEnvironment {
    pub name: String,
    pub description: String,
    pub config: Option<serde_json::Value>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EnvironmentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: Option<serde_json::Value>,
}

impl TaskStore {
    pub fn create_environment(&self, new: NewEnvironment) -> Result<Environment, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let environment = Environment {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name,
            description: new.description,
            config: new.config.unwrap_or_else(|| serde_json::json!({})),
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO environments (id, name, description, config, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                environment.id,
                environment.name,
                environment.description,
                serde_json::to_string(&environment.config)?,
                environment.user_id,
                environment.created_at,
                environment.updated_at,
            ],
        )?;
        Ok(environment)
    }

    pub fn get_environment(&self, id: &str) -> Result<Environment, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, description, config, user_id, created_at, updated_at
             FROM environments WHERE id = ?1",
            params![id],
            environment_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn list_environments(&self, user_id: Option<&str>) -> Result<Vec<Environment>, StoreError> {
        let conn = self.lock()?;
        let (sql, args): (&str, Vec<String>) = match user_id {
            Some(user) => (
                "SELECT id, name, description, config, user_id, created_at, updated_at
                 FROM environments WHERE user_id = ? ORDER BY name",
                vec![user.to_string()],
            ),
            None => (
                "SELECT id, name, description, config, user_id, created_at, updated_at
                 FROM environments ORDER BY name",
                Vec::new(),
            ),
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), environment_from_row)?;

        let mut environments = Vec::new();
        for row in rows {
            environments.push(row?);
        }
        Ok(environments)
    }

    pub fn update_environment(
        &self,
        id: &str,
        update: EnvironmentUpdate,
    ) -> Result<Environment, StoreError> {
        let mut environment = self.get_environment(id)?;
        if let Some(name) = update.name {
            environment.name = name;
        }
        if let Some(description) = update.description {
            environment.description = description;
        }
        if let Some(config) = update.config {
            environment.config = config;
        }
        environment.updated_at = chrono::Utc::now().timestamp();

        let conn = self.lock()?;
        conn.execute(
            "UPDATE environments SET name = ?2, description = ?3, config = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                environment.id,
                environment.name,
                environment.description,
                serde_json::to_string(&environment.config)?,
                environment.updated_at,
            ],
        )?;
        Ok(environment)
    }

    pub fn delete_environment(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM environments WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn environment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Environment> {
    let config_raw: String = row.get(3)?;
    let config = serde_json::from_str(&config_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Environment {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        config,
        user_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
