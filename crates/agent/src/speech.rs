use async_trait::async_trait;
use thiserror::Error;

use agentdock_core::response::ConfigsOutput;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech services are not configured")]
    NotConfigured,
    #[error("transcription failed: {0}")]
    Transcription(String),
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
}

/// Voice in and voice out. Implementations pick providers from the agent's
/// `transcriber`, `synthesizer` and `voice_id` settings.
#[async_trait]
pub trait SpeechService: Send + Sync {
    async fn speech_to_text(
        &self,
        voice_url: &str,
        configs: &ConfigsOutput,
    ) -> Result<String, SpeechError>;

    /// Returns the URL of the synthesized audio.
    async fn text_to_speech(&self, text: &str, configs: &ConfigsOutput)
        -> Result<String, SpeechError>;
}

#[derive(Clone, Debug, Default)]
pub struct UnconfiguredSpeech;

#[async_trait]
impl SpeechService for UnconfiguredSpeech {
    async fn speech_to_text(
        &self,
        _voice_url: &str,
        _configs: &ConfigsOutput,
    ) -> Result<String, SpeechError> {
        Err(SpeechError::NotConfigured)
    }

    async fn text_to_speech(
        &self,
        _text: &str,
        _configs: &ConfigsOutput,
    ) -> Result<String, SpeechError> {
        Err(SpeechError::NotConfigured)
    }
}
