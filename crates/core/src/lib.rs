//! Domain core for agentdock: agent and config-entry types, the canonical
//! value normalizer, config reconciliation, and the response shapes served to
//! API callers.

pub mod config;
pub mod configs;
pub mod domain;
pub mod errors;
pub mod response;
pub mod value;

pub use configs::{
    instantiate_template_configs, reconcile, AgentFactory, ConfigUpdates, ReconcileContext,
    RECOGNIZED_CONFIG_KEYS,
};
pub use domain::agent::{AgentId, AgentRecord, UserId};
pub use domain::chat::{ChatMessage, ChatMessageId, ChatRole, HistoryTurn, SessionId};
pub use domain::config_entry::{ConfigEntry, ConfigEntryId};
pub use errors::{ApplicationError, DomainError};
pub use response::{AgentOutput, AgentWithConfigsOutput, ConfigsOutput};
pub use value::{from_canonical_text, to_canonical_text, ConfigValue};
