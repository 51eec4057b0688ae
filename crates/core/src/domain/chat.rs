use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessageId(pub String);

impl ChatMessageId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    Human,
    Ai,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "human" => Some(Self::Human),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

/// A prior turn as handed to the task composer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub session_id: SessionId,
    pub role: ChatRole,
    pub text: String,
    pub parent_id: Option<ChatMessageId>,
    pub agent_id: Option<AgentId>,
    pub sender_name: Option<String>,
    pub voice_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn human(
        session_id: SessionId,
        text: impl Into<String>,
        sender_name: Option<String>,
    ) -> Self {
        Self {
            id: ChatMessageId::generate(),
            session_id,
            role: ChatRole::Human,
            text: text.into(),
            parent_id: None,
            agent_id: None,
            sender_name,
            voice_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn ai(
        session_id: SessionId,
        text: impl Into<String>,
        parent_id: ChatMessageId,
        agent_id: AgentId,
        voice_url: Option<String>,
    ) -> Self {
        Self {
            id: ChatMessageId::generate(),
            session_id,
            role: ChatRole::Ai,
            text: text.into(),
            parent_id: Some(parent_id),
            agent_id: Some(agent_id),
            sender_name: None,
            voice_url,
            created_at: Utc::now(),
        }
    }

    pub fn as_turn(&self) -> HistoryTurn {
        HistoryTurn { role: self.role, text: self.text.clone() }
    }
}
