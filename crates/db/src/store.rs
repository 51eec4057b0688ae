//! Agent and configuration service used by the CLI and the turn handler.

use std::sync::Arc;

use tracing::info;

use agentdock_core::configs::{
    reconcile, AgentFactory, ConfigUpdates, ReconcileContext, RECOGNIZED_CONFIG_KEYS,
};
use agentdock_core::domain::agent::{AgentId, AgentRecord, UserId};
use agentdock_core::domain::config_entry::ConfigEntry;
use agentdock_core::errors::{ApplicationError, DomainError};
use agentdock_core::response::{AgentOutput, AgentWithConfigsOutput, ConfigsOutput};

use crate::factory::TemplateAgentFactory;
use crate::repositories::{
    AgentConfigRepository, AgentRepository, InMemoryAgentConfigRepository,
    InMemoryAgentRepository, SqlAgentConfigRepository, SqlAgentRepository,
};
use crate::DbPool;

/// Fields accepted when creating an agent directly.
#[derive(Clone, Debug, Default)]
pub struct NewAgent {
    pub name: String,
    pub role: Option<String>,
    pub description: Option<String>,
    pub is_template: bool,
}

#[derive(Clone)]
pub struct ConfigStore {
    agents: Arc<dyn AgentRepository>,
    configs: Arc<dyn AgentConfigRepository>,
    factory: TemplateAgentFactory,
}

impl ConfigStore {
    pub fn new(agents: Arc<dyn AgentRepository>, configs: Arc<dyn AgentConfigRepository>) -> Self {
        let factory = TemplateAgentFactory::new(agents.clone(), configs.clone());
        Self { agents, configs, factory }
    }

    pub fn sql(pool: DbPool) -> Self {
        Self::new(
            Arc::new(SqlAgentRepository::new(pool.clone())),
            Arc::new(SqlAgentConfigRepository::new(pool)),
        )
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryAgentRepository::default()),
            Arc::new(InMemoryAgentConfigRepository::default()),
        )
    }

    pub async fn create_agent(
        &self,
        new_agent: NewAgent,
        actor: &UserId,
    ) -> Result<AgentRecord, ApplicationError> {
        if new_agent.name.trim().is_empty() {
            return Err(
                DomainError::InvariantViolation("agent name must not be empty".to_string()).into()
            );
        }
        let mut agent = AgentRecord::new(new_agent.name, Some(actor.clone()));
        agent.role = new_agent.role;
        agent.description = new_agent.description;
        agent.is_template = new_agent.is_template;
        self.agents.save(agent.clone()).await?;

        info!(
            event_name = "agent.created",
            agent_id = %agent.id,
            is_template = agent.is_template,
            "agent created"
        );
        Ok(agent)
    }

    /// Applies `incoming` to the agent's configuration and commits the result
    /// as one batch. Returns the entries that were written.
    pub async fn create_or_update(
        &self,
        agent_id: &AgentId,
        incoming: &ConfigUpdates,
        actor: &UserId,
    ) -> Result<Vec<ConfigEntry>, ApplicationError> {
        self.require_agent(agent_id).await?;
        let existing = self.configs.list_for_agent(agent_id).await?;

        // Runner agents are committed as they are realized; a failure later in
        // the call removes them again.
        let scope = self.factory.scope();
        let outcome = async {
            let ctx = ReconcileContext::new(agent_id, actor, &scope);
            let changes = reconcile(&existing, incoming, RECOGNIZED_CONFIG_KEYS, &ctx).await?;
            self.configs.save_all(changes.clone()).await?;
            Ok::<_, ApplicationError>(changes)
        }
        .await;
        let changes = match outcome {
            Ok(changes) => changes,
            Err(error) => {
                scope.discard().await;
                return Err(error);
            }
        };

        info!(
            event_name = "agent.config.saved",
            agent_id = %agent_id,
            changed = changes.len(),
            "agent configuration saved"
        );
        Ok(changes)
    }

    pub async fn create_agent_from_template(
        &self,
        template_id: &AgentId,
        actor: &UserId,
    ) -> Result<AgentRecord, ApplicationError> {
        let realized = self.factory.create_agent_from_template(template_id, actor, true).await?;
        self.require_agent(&realized).await
    }

    pub async fn agent_with_configs(
        &self,
        agent_id: &AgentId,
    ) -> Result<AgentWithConfigsOutput, ApplicationError> {
        let agent = self.require_agent(agent_id).await?;
        let entries = self.configs.list_for_agent(agent_id).await?;
        Ok(AgentWithConfigsOutput::build(&agent, &entries))
    }

    /// The agent record with its decoded configuration, for running turns.
    pub async fn load_agent(
        &self,
        agent_id: &AgentId,
    ) -> Result<(AgentRecord, ConfigsOutput), ApplicationError> {
        let agent = self.require_agent(agent_id).await?;
        let entries = self.configs.list_for_agent(agent_id).await?;
        Ok((agent, ConfigsOutput::from_entries(&entries)))
    }

    pub async fn list_agents(
        &self,
        templates_only: bool,
    ) -> Result<Vec<AgentOutput>, ApplicationError> {
        let agents = self.agents.list(templates_only).await?;
        Ok(agents.iter().map(AgentOutput::from).collect())
    }

    async fn require_agent(&self, agent_id: &AgentId) -> Result<AgentRecord, ApplicationError> {
        self.agents
            .find_by_id(agent_id)
            .await?
            .ok_or_else(|| DomainError::AgentNotFound(agent_id.0.clone()).into())
    }
}
