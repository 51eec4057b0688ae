use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use agentdock_core::domain::chat::ChatMessage;

#[derive(Debug, Error)]
#[error("chat delivery failed: {0}")]
pub struct PublishError(pub String);

/// Delivers a finished message to whoever is listening on its session.
#[async_trait]
pub trait ChatPublisher: Send + Sync {
    async fn publish(&self, message: &ChatMessage) -> Result<(), PublishError>;
}

/// Emits each message as a structured log event.
#[derive(Clone, Debug, Default)]
pub struct LogChatPublisher;

#[async_trait]
impl ChatPublisher for LogChatPublisher {
    async fn publish(&self, message: &ChatMessage) -> Result<(), PublishError> {
        info!(
            event_name = "chat.message.published",
            session_id = %message.session_id.0,
            message_id = %message.id.0,
            role = message.role.as_str(),
            has_voice = message.voice_url.is_some(),
            text_len = message.text.len(),
            "chat message published"
        );
        Ok(())
    }
}
