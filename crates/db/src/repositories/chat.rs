use sqlx::{sqlite::SqliteRow, Row};

use agentdock_core::domain::agent::AgentId;
use agentdock_core::domain::chat::{ChatMessage, ChatMessageId, ChatRole, SessionId};

use super::{format_timestamp, parse_timestamp, ChatHistoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlChatHistoryRepository {
    pool: DbPool,
}

impl SqlChatHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ChatHistoryRepository for SqlChatHistoryRepository {
    async fn append(&self, message: ChatMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO chat_message (
                id,
                session_id,
                role,
                text,
                parent_id,
                agent_id,
                sender_name,
                voice_url,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id.0)
        .bind(&message.session_id.0)
        .bind(message.role.as_str())
        .bind(&message.text)
        .bind(message.parent_id.as_ref().map(|id| id.0.clone()))
        .bind(message.agent_id.as_ref().map(|id| id.0.clone()))
        .bind(&message.sender_name)
        .bind(&message.voice_url)
        .bind(format_timestamp(&message.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT * FROM (
                SELECT
                    rowid AS seq,
                    id,
                    session_id,
                    role,
                    text,
                    parent_id,
                    agent_id,
                    sender_name,
                    voice_url,
                    created_at
                 FROM chat_message
                 WHERE session_id = ?
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?
             )
             ORDER BY created_at ASC, seq ASC",
        )
        .bind(&session_id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }
}

fn message_from_row(row: SqliteRow) -> Result<ChatMessage, RepositoryError> {
    let role_raw = row.try_get::<String, _>("role")?;
    let role = ChatRole::parse(&role_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown chat role `{role_raw}`")))?;

    Ok(ChatMessage {
        id: ChatMessageId(row.try_get("id")?),
        session_id: SessionId(row.try_get("session_id")?),
        role,
        text: row.try_get("text")?,
        parent_id: row.try_get::<Option<String>, _>("parent_id")?.map(ChatMessageId),
        agent_id: row.try_get::<Option<String>, _>("agent_id")?.map(AgentId),
        sender_name: row.try_get("sender_name")?,
        voice_url: row.try_get("voice_url")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
