//! One chat turn, from user input to a persisted and published reply.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use agentdock_core::domain::agent::AgentRecord;
use agentdock_core::domain::chat::{ChatMessage, SessionId};
use agentdock_core::errors::ApplicationError;
use agentdock_core::response::ConfigsOutput;
use agentdock_db::repositories::ChatHistoryRepository;

use crate::adapter::TaskAdapter;
use crate::engine::{EngineConfig, TaskEngine, DEFAULT_ROLE};
use crate::errors::{user_error_message, TurnError};
use crate::publish::ChatPublisher;
use crate::speech::SpeechService;
use crate::system_message::SystemMessageBuilder;
use crate::task::TaskInvocation;

pub const VOICE_RESPONSE_MODE: &str = "Voice";
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Clone, Debug)]
pub struct Turn {
    pub session_id: SessionId,
    pub agent: AgentRecord,
    pub configs: ConfigsOutput,
    pub prompt: String,
    pub voice_url: Option<String>,
    pub sender_name: Option<String>,
    pub pre_retrieved_context: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub reply: String,
    pub human_message: ChatMessage,
    pub ai_message: ChatMessage,
}

pub struct ConversationalAgent {
    engine_config_path: PathBuf,
    engine: Arc<dyn TaskEngine>,
    role: String,
    history_limit: usize,
    history: Arc<dyn ChatHistoryRepository>,
    speech: Arc<dyn SpeechService>,
    publisher: Arc<dyn ChatPublisher>,
}

impl ConversationalAgent {
    pub fn new(
        engine_config_path: impl Into<PathBuf>,
        engine: Arc<dyn TaskEngine>,
        history: Arc<dyn ChatHistoryRepository>,
        speech: Arc<dyn SpeechService>,
        publisher: Arc<dyn ChatPublisher>,
    ) -> Self {
        Self {
            engine_config_path: engine_config_path.into(),
            engine,
            role: DEFAULT_ROLE.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            history,
            speech,
            publisher,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    /// Engine and speech failures become the reply text. Only storage
    /// failures are returned as errors.
    pub async fn run(&self, turn: Turn) -> Result<TurnOutcome, ApplicationError> {
        let prior = self.history.recent(&turn.session_id, self.history_limit).await?;

        let transcribed = match turn.voice_url.as_deref() {
            Some(voice_url) => self
                .speech
                .speech_to_text(voice_url, &turn.configs)
                .await
                .map(Some)
                .map_err(TurnError::from),
            None => Ok(None),
        };
        let prompt = match &transcribed {
            Ok(Some(text)) => text.clone(),
            _ => turn.prompt.clone(),
        };

        let mut human_message =
            ChatMessage::human(turn.session_id.clone(), prompt.clone(), turn.sender_name.clone());
        human_message.voice_url = turn.voice_url.clone();
        self.history.append(human_message.clone()).await?;

        let primary = match transcribed {
            Ok(_) => {
                let system_text = {
                    let builder = SystemMessageBuilder::new(&turn.agent, &turn.configs);
                    match turn.pre_retrieved_context.as_deref() {
                        Some(context) => builder.with_context(context).build(),
                        None => builder.build(),
                    }
                };
                let invocation = TaskInvocation {
                    history: prior.iter().map(ChatMessage::as_turn).collect(),
                    instruction: prompt,
                    system_text,
                };
                self.run_task(&invocation.compose()).await
            }
            Err(error) => Err(error),
        };

        let mut reply = match primary {
            Ok(text) => text,
            Err(error) => {
                warn!(
                    event_name = "agent.turn.failed",
                    agent_id = %turn.agent.id,
                    session_id = %turn.session_id.0,
                    error = %error,
                    "turn failed, replying with an error message"
                );
                user_error_message(&error)
            }
        };

        let mut voice_url = None;
        if turn.configs.has_response_mode(VOICE_RESPONSE_MODE) {
            match self.speech.text_to_speech(&reply, &turn.configs).await {
                Ok(url) => voice_url = Some(url),
                Err(error) => {
                    warn!(
                        event_name = "agent.turn.speech_failed",
                        agent_id = %turn.agent.id,
                        error = %error,
                        "text to speech failed, keeping the text reply"
                    );
                    reply = format!("{reply}\n\n{}", user_error_message(&TurnError::from(error)));
                }
            }
        }

        let ai_message = ChatMessage::ai(
            turn.session_id.clone(),
            reply.clone(),
            human_message.id.clone(),
            turn.agent.id.clone(),
            voice_url,
        );
        self.history.append(ai_message.clone()).await?;

        if let Err(error) = self.publisher.publish(&ai_message).await {
            warn!(
                event_name = "chat.message.publish_failed",
                message_id = %ai_message.id.0,
                error = %error,
                "reply was stored but could not be delivered"
            );
        }

        info!(
            event_name = "agent.turn.completed",
            agent_id = %turn.agent.id,
            session_id = %turn.session_id.0,
            history_turns = prior.len(),
            reply_len = reply.len(),
            "turn completed"
        );
        Ok(TurnOutcome { reply, human_message, ai_message })
    }

    async fn run_task(&self, task: &str) -> Result<String, TurnError> {
        let config = EngineConfig::load(&self.engine_config_path)?;
        let adapter =
            TaskAdapter::new(config, Arc::clone(&self.engine)).with_role(self.role.clone());
        Ok(adapter.run(task).await?.text)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use agentdock_core::domain::agent::AgentRecord;
    use agentdock_core::domain::chat::{ChatMessage, ChatRole, SessionId};
    use agentdock_core::response::ConfigsOutput;
    use agentdock_db::repositories::{ChatHistoryRepository, InMemoryChatHistoryRepository};

    use super::{ConversationalAgent, Turn};
    use crate::engine::{EngineError, EngineRequest, LoadedEngineConfig, RunRecord, TaskEngine};
    use crate::publish::{ChatPublisher, PublishError};
    use crate::speech::{SpeechError, SpeechService, UnconfiguredSpeech};

    /// Writes the task it was given into `report.md` and records it.
    struct EchoEngine {
        output_dir: PathBuf,
        tasks: Mutex<Vec<String>>,
    }

    impl TaskEngine for EchoEngine {
        fn run(
            &self,
            _config: &LoadedEngineConfig,
            request: &EngineRequest,
        ) -> Result<RunRecord, EngineError> {
            if let Ok(mut tasks) = self.tasks.lock() {
                tasks.push(request.task.clone());
            }
            fs::write(self.output_dir.join("report.md"), "done").map_err(|source| {
                EngineError::Workspace { path: self.output_dir.clone(), source }
            })?;
            Ok(RunRecord { output_dir: self.output_dir.clone() })
        }
    }

    struct BrokenEngine;

    impl TaskEngine for BrokenEngine {
        fn run(
            &self,
            _config: &LoadedEngineConfig,
            _request: &EngineRequest,
        ) -> Result<RunRecord, EngineError> {
            Err(EngineError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "engine crashed".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<ChatMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatPublisher for RecordingPublisher {
        async fn publish(&self, message: &ChatMessage) -> Result<(), PublishError> {
            if self.fail {
                return Err(PublishError("socket closed".to_string()));
            }
            self.published
                .lock()
                .map_err(|_| PublishError("lock poisoned".to_string()))?
                .push(message.clone());
            Ok(())
        }
    }

    struct TranscribingSpeech;

    #[async_trait]
    impl SpeechService for TranscribingSpeech {
        async fn speech_to_text(
            &self,
            _voice_url: &str,
            _configs: &ConfigsOutput,
        ) -> Result<String, SpeechError> {
            Ok("transcribed request".to_string())
        }

        async fn text_to_speech(
            &self,
            _text: &str,
            _configs: &ConfigsOutput,
        ) -> Result<String, SpeechError> {
            Ok("https://audio.example/reply.mp3".to_string())
        }
    }

    struct Harness {
        _dir: TempDir,
        config_path: PathBuf,
        output_dir: PathBuf,
        history: Arc<InMemoryChatHistoryRepository>,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().expect("tempdir");
        let config_path = dir.path().join("xagent_config.yml");
        fs::write(&config_path, "command: unused\n").expect("write config");
        let output_dir = dir.path().join("run");
        fs::create_dir(&output_dir).expect("mkdir");
        Harness {
            _dir: dir,
            config_path,
            output_dir,
            history: Arc::new(InMemoryChatHistoryRepository::default()),
        }
    }

    fn echo_engine(harness: &Harness) -> Arc<EchoEngine> {
        Arc::new(EchoEngine {
            output_dir: harness.output_dir.clone(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    fn agent_with(
        harness: &Harness,
        engine: Arc<dyn TaskEngine>,
        speech: Arc<dyn SpeechService>,
        publisher: Arc<RecordingPublisher>,
    ) -> ConversationalAgent {
        ConversationalAgent::new(
            &harness.config_path,
            engine,
            harness.history.clone(),
            speech,
            publisher,
        )
    }

    fn response_modes(modes: &[&str]) -> ConfigsOutput {
        ConfigsOutput {
            response_mode: modes.iter().map(|mode| mode.to_string()).collect(),
            ..ConfigsOutput::default()
        }
    }

    fn turn(session: &str, prompt: &str, configs: ConfigsOutput) -> Turn {
        Turn {
            session_id: SessionId(session.to_string()),
            agent: AgentRecord::new("Ada", None),
            configs,
            prompt: prompt.to_string(),
            voice_url: None,
            sender_name: Some("Grace".to_string()),
            pre_retrieved_context: None,
        }
    }

    #[tokio::test]
    async fn successful_turn_carries_history_and_persists_both_messages() {
        let harness = harness();
        let engine = echo_engine(&harness);
        let publisher = Arc::new(RecordingPublisher::default());
        let agent =
            agent_with(&harness, engine.clone(), Arc::new(UnconfiguredSpeech), publisher.clone());

        agent
            .run(turn("s-1", "first question", ConfigsOutput::default()))
            .await
            .expect("first turn");
        let outcome = agent
            .run(turn("s-1", "second question", ConfigsOutput::default()))
            .await
            .expect("second turn");

        assert_eq!(
            outcome.reply,
            "Task completed. The primary output file is 'report.md'.\n\n--- FILE CONTENT ---\ndone"
        );
        assert_eq!(outcome.ai_message.parent_id.as_ref(), Some(&outcome.human_message.id));

        let tasks = engine.tasks.lock().expect("tasks").clone();
        assert!(tasks[1].contains("[HUMAN]: first question\n[AI]: Task completed."));
        assert!(tasks[1].contains("--- Latest User Request ---\nsecond question\n"));
        assert!(tasks[1].contains("--- System Instructions ---\nYou are Ada.\n"));

        let stored =
            harness.history.recent(&SessionId("s-1".to_string()), 10).await.expect("history");
        assert_eq!(
            stored.iter().map(|message| message.role).collect::<Vec<_>>(),
            vec![ChatRole::Human, ChatRole::Ai, ChatRole::Human, ChatRole::Ai]
        );
        assert_eq!(publisher.published.lock().expect("published").len(), 2);
    }

    #[tokio::test]
    async fn engine_failure_becomes_a_published_reply() {
        let harness = harness();
        let publisher = Arc::new(RecordingPublisher::default());
        let agent = agent_with(
            &harness,
            Arc::new(BrokenEngine),
            Arc::new(UnconfiguredSpeech),
            publisher.clone(),
        );

        let outcome =
            agent.run(turn("s-2", "do it", ConfigsOutput::default())).await.expect("turn");

        assert_eq!(outcome.reply, "The task could not be completed: engine crashed");
        let published = publisher.published.lock().expect("published");
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].text, outcome.reply);
    }

    #[tokio::test]
    async fn missing_engine_config_is_reported_to_the_user() {
        let harness = harness();
        let agent = ConversationalAgent::new(
            harness.config_path.with_file_name("absent.yml"),
            Arc::new(BrokenEngine),
            harness.history.clone(),
            Arc::new(UnconfiguredSpeech),
            Arc::new(RecordingPublisher::default()),
        );

        let outcome =
            agent.run(turn("s-3", "do it", ConfigsOutput::default())).await.expect("turn");
        assert!(outcome.reply.starts_with("The task engine is not configured correctly."));
    }

    #[tokio::test]
    async fn speech_failure_appends_to_the_primary_reply() {
        let harness = harness();
        let agent = agent_with(
            &harness,
            echo_engine(&harness),
            Arc::new(UnconfiguredSpeech),
            Arc::new(RecordingPublisher::default()),
        );

        let outcome = agent
            .run(turn("s-4", "speak", response_modes(&["Text", "Voice"])))
            .await
            .expect("turn");

        let (primary, appended) = outcome
            .reply
            .split_once("\n\n--- FILE CONTENT ---\ndone\n\n")
            .expect("appended error");
        assert!(primary.starts_with("Task completed."));
        assert!(appended.contains("speech services are not configured"));
        assert_eq!(outcome.ai_message.voice_url, None);
    }

    #[tokio::test]
    async fn voice_input_is_transcribed_and_voice_reply_attached() {
        let harness = harness();
        let engine = echo_engine(&harness);
        let agent = agent_with(
            &harness,
            engine.clone(),
            Arc::new(TranscribingSpeech),
            Arc::new(RecordingPublisher::default()),
        );
        let mut voice_turn = turn("s-5", "", response_modes(&["Voice"]));
        voice_turn.voice_url = Some("https://audio.example/in.wav".to_string());

        let outcome = agent.run(voice_turn).await.expect("turn");

        assert_eq!(outcome.human_message.text, "transcribed request");
        assert_eq!(
            outcome.ai_message.voice_url.as_deref(),
            Some("https://audio.example/reply.mp3")
        );
        let tasks = engine.tasks.lock().expect("tasks");
        assert!(tasks[0].contains("--- Latest User Request ---\ntranscribed request\n"));
    }

    #[tokio::test]
    async fn failed_transcription_skips_the_engine() {
        let harness = harness();
        let engine = echo_engine(&harness);
        let agent = agent_with(
            &harness,
            engine.clone(),
            Arc::new(UnconfiguredSpeech),
            Arc::new(RecordingPublisher::default()),
        );
        let mut voice_turn = turn("s-6", "", ConfigsOutput::default());
        voice_turn.voice_url = Some("https://audio.example/in.wav".to_string());

        let outcome = agent.run(voice_turn).await.expect("turn");

        assert!(outcome.reply.starts_with("Voice messages are not available"));
        assert!(engine.tasks.lock().expect("tasks").is_empty());
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_the_turn() {
        let harness = harness();
        let agent = agent_with(
            &harness,
            echo_engine(&harness),
            Arc::new(UnconfiguredSpeech),
            Arc::new(RecordingPublisher { published: Mutex::new(Vec::new()), fail: true }),
        );

        let outcome =
            agent.run(turn("s-7", "hello", ConfigsOutput::default())).await.expect("turn");
        assert!(!outcome.reply.is_empty());
        let stored =
            harness.history.recent(&SessionId("s-7".to_string()), 5).await.expect("history");
        assert_eq!(stored.len(), 2);
    }
}
