use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use agentdock_core::domain::agent::{AgentId, AgentRecord};
use agentdock_core::domain::chat::{ChatMessage, SessionId};
use agentdock_core::domain::config_entry::ConfigEntry;
use agentdock_core::errors::ApplicationError;

pub mod agent;
pub mod agent_config;
pub mod chat;
pub mod memory;

pub use agent::SqlAgentRepository;
pub use agent_config::SqlAgentConfigRepository;
pub use chat::SqlChatHistoryRepository;
pub use memory::{
    InMemoryAgentConfigRepository, InMemoryAgentRepository, InMemoryChatHistoryRepository,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        Self::Persistence(value.to_string())
    }
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn find_by_id(&self, id: &AgentId) -> Result<Option<AgentRecord>, RepositoryError>;
    async fn save(&self, agent: AgentRecord) -> Result<(), RepositoryError>;
    async fn list(&self, templates_only: bool) -> Result<Vec<AgentRecord>, RepositoryError>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: &AgentId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait AgentConfigRepository: Send + Sync {
    async fn list_for_agent(&self, agent_id: &AgentId)
        -> Result<Vec<ConfigEntry>, RepositoryError>;

    /// Persists every entry or none of them.
    async fn save_all(&self, entries: Vec<ConfigEntry>) -> Result<(), RepositoryError>;

    async fn delete_for_agent(&self, agent_id: &AgentId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ChatHistoryRepository: Send + Sync {
    async fn append(&self, message: ChatMessage) -> Result<(), RepositoryError>;

    /// The last `limit` messages of a session, oldest first.
    async fn recent(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;
}

pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}
