use std::collections::HashMap;

use tokio::sync::RwLock;

use agentdock_core::domain::agent::{AgentId, AgentRecord};
use agentdock_core::domain::chat::{ChatMessage, SessionId};
use agentdock_core::domain::config_entry::ConfigEntry;

use super::{AgentConfigRepository, AgentRepository, ChatHistoryRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryAgentRepository {
    agents: RwLock<Vec<AgentRecord>>,
}

#[async_trait::async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn find_by_id(&self, id: &AgentId) -> Result<Option<AgentRecord>, RepositoryError> {
        let agents = self.agents.read().await;
        Ok(agents.iter().find(|agent| &agent.id == id).cloned())
    }

    async fn save(&self, agent: AgentRecord) -> Result<(), RepositoryError> {
        let mut agents = self.agents.write().await;
        match agents.iter_mut().find(|existing| existing.id == agent.id) {
            Some(existing) => *existing = agent,
            None => agents.push(agent),
        }
        Ok(())
    }

    async fn list(&self, templates_only: bool) -> Result<Vec<AgentRecord>, RepositoryError> {
        let agents = self.agents.read().await;
        Ok(agents.iter().filter(|agent| !templates_only || agent.is_template).cloned().collect())
    }

    async fn delete(&self, id: &AgentId) -> Result<bool, RepositoryError> {
        let mut agents = self.agents.write().await;
        let before = agents.len();
        agents.retain(|agent| &agent.id != id);
        Ok(agents.len() < before)
    }
}

/// Entries per agent, kept in insertion order.
#[derive(Default)]
pub struct InMemoryAgentConfigRepository {
    entries: RwLock<HashMap<String, Vec<ConfigEntry>>>,
}

#[async_trait::async_trait]
impl AgentConfigRepository for InMemoryAgentConfigRepository {
    async fn list_for_agent(
        &self,
        agent_id: &AgentId,
    ) -> Result<Vec<ConfigEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&agent_id.0).cloned().unwrap_or_default())
    }

    async fn save_all(&self, batch: Vec<ConfigEntry>) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        for entry in batch {
            let owned = entries.entry(entry.agent_id.0.clone()).or_default();
            match owned.iter_mut().find(|existing| existing.key == entry.key) {
                Some(existing) => {
                    existing.value = entry.value;
                    existing.modified_by = entry.modified_by.or(entry.created_by);
                    existing.updated_at = entry.updated_at;
                }
                None => owned.push(entry),
            }
        }
        Ok(())
    }

    async fn delete_for_agent(&self, agent_id: &AgentId) -> Result<(), RepositoryError> {
        self.entries.write().await.remove(&agent_id.0);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryChatHistoryRepository {
    sessions: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

#[async_trait::async_trait]
impl ChatHistoryRepository for InMemoryChatHistoryRepository {
    async fn append(&self, message: ChatMessage) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.entry(message.session_id.0.clone()).or_default().push(message);
        Ok(())
    }

    async fn recent(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let sessions = self.sessions.read().await;
        let Some(messages) = sessions.get(&session_id.0) else {
            return Ok(Vec::new());
        };
        let skip = messages.len().saturating_sub(limit);
        Ok(messages[skip..].to_vec())
    }
}
