use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// The owning entity of configuration entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub name: String,
    pub role: Option<String>,
    pub description: Option<String>,
    pub is_template: bool,
    pub template_id: Option<AgentId>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentRecord {
    pub fn new(name: impl Into<String>, created_by: Option<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::generate(),
            name: name.into(),
            role: None,
            description: None,
            is_template: false,
            template_id: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// A fresh, non-template agent carrying the template's descriptive fields.
    pub fn realize_from(template: &AgentRecord, actor: &UserId) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::generate(),
            name: template.name.clone(),
            role: template.role.clone(),
            description: template.description.clone(),
            is_template: false,
            template_id: Some(template.id.clone()),
            created_by: Some(actor.clone()),
            created_at: now,
            updated_at: now,
        }
    }
}
