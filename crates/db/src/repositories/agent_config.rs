use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use agentdock_core::domain::agent::{AgentId, UserId};
use agentdock_core::domain::config_entry::{ConfigEntry, ConfigEntryId};

use super::{format_timestamp, parse_timestamp, AgentConfigRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAgentConfigRepository {
    pool: DbPool,
}

impl SqlAgentConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AgentConfigRepository for SqlAgentConfigRepository {
    async fn list_for_agent(
        &self,
        agent_id: &AgentId,
    ) -> Result<Vec<ConfigEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                agent_id,
                key,
                value,
                created_by,
                modified_by,
                created_at,
                updated_at
             FROM agent_config
             WHERE agent_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(&agent_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }

    async fn save_all(&self, entries: Vec<ConfigEntry>) -> Result<(), RepositoryError> {
        if entries.is_empty() {
            return Ok(());
        }

        let count = entries.len();
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            // Concurrent writers race on (agent_id, key); the last commit wins.
            sqlx::query(
                "INSERT INTO agent_config (
                    id,
                    agent_id,
                    key,
                    value,
                    created_by,
                    modified_by,
                    created_at,
                    updated_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(agent_id, key) DO UPDATE SET
                    value = excluded.value,
                    modified_by = COALESCE(excluded.modified_by, excluded.created_by),
                    updated_at = excluded.updated_at",
            )
            .bind(&entry.id.0)
            .bind(&entry.agent_id.0)
            .bind(&entry.key)
            .bind(&entry.value)
            .bind(entry.created_by.as_ref().map(|id| id.0.clone()))
            .bind(entry.modified_by.as_ref().map(|id| id.0.clone()))
            .bind(format_timestamp(&entry.created_at))
            .bind(format_timestamp(&entry.updated_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(event_name = "db.agent_config.saved", count, "config batch committed");
        Ok(())
    }

    async fn delete_for_agent(&self, agent_id: &AgentId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM agent_config WHERE agent_id = ?")
            .bind(&agent_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn entry_from_row(row: SqliteRow) -> Result<ConfigEntry, RepositoryError> {
    Ok(ConfigEntry {
        id: ConfigEntryId(row.try_get("id")?),
        agent_id: AgentId(row.try_get("agent_id")?),
        key: row.try_get("key")?,
        value: row.try_get("value")?,
        created_by: row.try_get::<Option<String>, _>("created_by")?.map(UserId),
        modified_by: row.try_get::<Option<String>, _>("modified_by")?.map(UserId),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
