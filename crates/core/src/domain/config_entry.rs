use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentId, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigEntryId(pub String);

impl ConfigEntryId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// One `(agent, key)` configuration row. A non-null `value` is always JSON text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub id: ConfigEntryId,
    pub agent_id: AgentId,
    pub key: String,
    pub value: Option<String>,
    pub created_by: Option<UserId>,
    pub modified_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConfigEntry {
    pub fn create(
        agent_id: AgentId,
        key: impl Into<String>,
        value: Option<String>,
        actor: &UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ConfigEntryId::generate(),
            agent_id,
            key: key.into(),
            value,
            created_by: Some(actor.clone()),
            modified_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn overwrite(&mut self, value: Option<String>, actor: &UserId) {
        self.value = value;
        self.modified_by = Some(actor.clone());
        self.updated_at = Utc::now();
    }
}
