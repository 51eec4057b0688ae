use sqlx::{sqlite::SqliteRow, Row};

use agentdock_core::domain::agent::{AgentId, AgentRecord, UserId};

use super::{format_timestamp, parse_timestamp, AgentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAgentRepository {
    pool: DbPool,
}

impl SqlAgentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AgentRepository for SqlAgentRepository {
    async fn find_by_id(&self, id: &AgentId) -> Result<Option<AgentRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                name,
                role,
                description,
                is_template,
                template_id,
                created_by,
                created_at,
                updated_at
             FROM agent
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(agent_from_row).transpose()
    }

    async fn save(&self, agent: AgentRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO agent (
                id,
                name,
                role,
                description,
                is_template,
                template_id,
                created_by,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                role = excluded.role,
                description = excluded.description,
                is_template = excluded.is_template,
                template_id = excluded.template_id,
                updated_at = excluded.updated_at",
        )
        .bind(&agent.id.0)
        .bind(&agent.name)
        .bind(&agent.role)
        .bind(&agent.description)
        .bind(agent.is_template)
        .bind(agent.template_id.as_ref().map(|id| id.0.clone()))
        .bind(agent.created_by.as_ref().map(|id| id.0.clone()))
        .bind(format_timestamp(&agent.created_at))
        .bind(format_timestamp(&agent.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &AgentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM agent WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, templates_only: bool) -> Result<Vec<AgentRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                name,
                role,
                description,
                is_template,
                template_id,
                created_by,
                created_at,
                updated_at
             FROM agent
             WHERE (? = 0 OR is_template = 1)
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(templates_only)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(agent_from_row).collect()
    }
}

fn agent_from_row(row: SqliteRow) -> Result<AgentRecord, RepositoryError> {
    Ok(AgentRecord {
        id: AgentId(row.try_get("id")?),
        name: row.try_get("name")?,
        role: row.try_get("role")?,
        description: row.try_get("description")?,
        is_template: row.try_get("is_template")?,
        template_id: row.try_get::<Option<String>, _>("template_id")?.map(AgentId),
        created_by: row.try_get::<Option<String>, _>("created_by")?.map(UserId),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use agentdock_core::domain::agent::{AgentId, AgentRecord, UserId};

    use super::SqlAgentRepository;
    use crate::repositories::test_support::{parse_ts, setup_pool};
    use crate::repositories::AgentRepository;

    fn sample_agent(id: &str, is_template: bool) -> AgentRecord {
        AgentRecord {
            id: AgentId(id.to_string()),
            name: format!("Agent {id}"),
            role: Some("Support".to_string()),
            description: None,
            is_template,
            template_id: None,
            created_by: Some(UserId("user-1".to_string())),
            created_at: parse_ts("2026-03-01T10:00:00Z"),
            updated_at: parse_ts("2026-03-01T10:00:00Z"),
        }
    }

    #[tokio::test]
    async fn sql_agent_repo_round_trip() {
        let pool = setup_pool().await;
        let repo = SqlAgentRepository::new(pool.clone());
        let agent = sample_agent("agent-1", false);

        repo.save(agent.clone()).await.expect("save");
        assert_eq!(repo.find_by_id(&agent.id).await.expect("find"), Some(agent));
        assert_eq!(repo.find_by_id(&AgentId("nope".to_string())).await.expect("find"), None);

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_agent_repo_save_updates_existing_row() {
        let pool = setup_pool().await;
        let repo = SqlAgentRepository::new(pool.clone());
        let mut agent = sample_agent("agent-2", false);
        repo.save(agent.clone()).await.expect("save");

        agent.name = "Renamed".to_string();
        agent.updated_at = parse_ts("2026-03-02T10:00:00Z");
        repo.save(agent.clone()).await.expect("update");

        assert_eq!(repo.find_by_id(&agent.id).await.expect("find"), Some(agent));
        pool.close().await;
    }

    #[tokio::test]
    async fn sql_agent_repo_lists_templates_only_when_asked() {
        let pool = setup_pool().await;
        let repo = SqlAgentRepository::new(pool.clone());
        repo.save(sample_agent("plain", false)).await.expect("save plain");
        repo.save(sample_agent("tpl", true)).await.expect("save template");

        let all = repo.list(false).await.expect("list all");
        let templates = repo.list(true).await.expect("list templates");

        assert_eq!(all.len(), 2);
        let ids: Vec<_> = templates.iter().map(|agent| agent.id.0.as_str()).collect();
        assert_eq!(ids, vec!["tpl"]);
        pool.close().await;
    }

    #[tokio::test]
    async fn sql_agent_repo_delete_reports_whether_a_row_went() {
        let pool = setup_pool().await;
        let repo = SqlAgentRepository::new(pool.clone());
        let agent = sample_agent("doomed", false);
        repo.save(agent.clone()).await.expect("save");

        assert!(repo.delete(&agent.id).await.expect("delete"));
        assert!(!repo.delete(&agent.id).await.expect("delete again"));
        assert_eq!(repo.find_by_id(&agent.id).await.expect("find"), None);
        pool.close().await;
    }
}
