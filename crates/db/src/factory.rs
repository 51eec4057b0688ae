use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{info, warn};

use agentdock_core::configs::{instantiate_template_configs, AgentFactory, ReconcileContext};
use agentdock_core::domain::agent::{AgentId, AgentRecord, UserId};
use agentdock_core::errors::{ApplicationError, DomainError};

use crate::repositories::{AgentConfigRepository, AgentRepository};

/// Realizes template agents into concrete ones. Runner templates referenced by
/// the copied configs are realized recursively; reference cycles are not
/// detected.
#[derive(Clone)]
pub struct TemplateAgentFactory {
    agents: Arc<dyn AgentRepository>,
    configs: Arc<dyn AgentConfigRepository>,
}

impl TemplateAgentFactory {
    pub fn new(agents: Arc<dyn AgentRepository>, configs: Arc<dyn AgentConfigRepository>) -> Self {
        Self { agents, configs }
    }

    /// Starts a unit of work that remembers every agent realized through it,
    /// nested runners included, so a failed caller can remove them again.
    pub fn scope(&self) -> RealizationScope<'_> {
        RealizationScope { factory: self, realized: Mutex::new(Vec::new()) }
    }

    async fn realize(
        &self,
        template_id: &AgentId,
        actor: &UserId,
        check_is_template: bool,
        scope: &RealizationScope<'_>,
    ) -> Result<AgentId, ApplicationError> {
        let template = self
            .agents
            .find_by_id(template_id)
            .await?
            .ok_or_else(|| DomainError::AgentNotFound(template_id.0.clone()))?;
        if check_is_template && !template.is_template {
            return Err(DomainError::NotATemplate(template_id.0.clone()).into());
        }

        let realized = AgentRecord::realize_from(&template, actor);
        self.agents.save(realized.clone()).await?;
        scope.record(realized.id.clone());

        let template_entries = self.configs.list_for_agent(template_id).await?;
        let ctx = ReconcileContext {
            owner: &realized.id,
            actor,
            factory: scope,
            check_is_template,
        };
        let entries = instantiate_template_configs(&template_entries, &ctx).await?;
        let copied = entries.len();
        self.configs.save_all(entries).await?;

        info!(
            event_name = "agent.template.realized",
            template_id = %template_id,
            agent_id = %realized.id,
            copied,
            "template agent realized"
        );
        Ok(realized.id)
    }

    async fn remove(&self, agent_id: &AgentId) -> Result<(), ApplicationError> {
        self.configs.delete_for_agent(agent_id).await?;
        self.agents.delete(agent_id).await?;
        Ok(())
    }
}

pub struct RealizationScope<'a> {
    factory: &'a TemplateAgentFactory,
    realized: Mutex<Vec<AgentId>>,
}

impl RealizationScope<'_> {
    fn record(&self, agent_id: AgentId) {
        self.realized.lock().unwrap_or_else(PoisonError::into_inner).push(agent_id);
    }

    pub fn realized(&self) -> Vec<AgentId> {
        self.realized.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Deletes the agents realized in this scope, newest first. Removal is
    /// best effort: a failure is logged and the remaining agents are still
    /// attempted.
    pub async fn discard(self) {
        let RealizationScope { factory, realized } = self;
        let realized = realized.into_inner().unwrap_or_else(PoisonError::into_inner);
        for agent_id in realized.iter().rev() {
            match factory.remove(agent_id).await {
                Ok(()) => info!(
                    event_name = "agent.template.discarded",
                    agent_id = %agent_id,
                    "realized agent removed after a failed operation"
                ),
                Err(error) => warn!(
                    event_name = "agent.template.discard_failed",
                    agent_id = %agent_id,
                    error = %error,
                    "realized agent could not be removed"
                ),
            }
        }
    }
}

#[async_trait]
impl<'a> AgentFactory for RealizationScope<'a> {
    async fn create_agent_from_template(
        &self,
        template_id: &AgentId,
        actor: &UserId,
        check_is_template: bool,
    ) -> Result<AgentId, ApplicationError> {
        self.factory.realize(template_id, actor, check_is_template, self).await
    }
}

#[async_trait]
impl AgentFactory for TemplateAgentFactory {
    async fn create_agent_from_template(
        &self,
        template_id: &AgentId,
        actor: &UserId,
        check_is_template: bool,
    ) -> Result<AgentId, ApplicationError> {
        let scope = self.scope();
        let result = self.realize(template_id, actor, check_is_template, &scope).await;
        if result.is_err() {
            scope.discard().await;
        }
        result
    }
}
