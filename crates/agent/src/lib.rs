//! Conversational turns backed by an external task engine.
//!
//! A turn flows through:
//! 1. **Speech** (`speech`) - optional transcription of voice input
//! 2. **Task composition** (`task`, `system_message`) - history, request and
//!    standing instructions folded into one task string
//! 3. **Engine run** (`engine`, `adapter`) - the engine runs to completion on a
//!    blocking worker; its workspace is scanned for the primary output file
//! 4. **Delivery** (`conversational`, `publish`) - the reply is stored in chat
//!    history and published
//!
//! Engine and speech failures never escape a turn: `errors::user_error_message`
//! turns them into reply text.

pub mod adapter;
pub mod conversational;
pub mod engine;
pub mod errors;
pub mod publish;
pub mod speech;
pub mod system_message;
pub mod task;

pub use adapter::{collect_output, AdapterError, EngineResult, OutputSource, TaskAdapter};
pub use conversational::{ConversationalAgent, Turn, TurnOutcome};
pub use engine::{
    CommandEngine, EngineConfig, EngineConfigError, EngineError, EngineMode, EngineRequest,
    LoadedEngineConfig, RunRecord, TaskEngine,
};
pub use errors::{user_error_message, TurnError};
pub use publish::{ChatPublisher, LogChatPublisher, PublishError};
pub use speech::{SpeechError, SpeechService, UnconfiguredSpeech};
pub use system_message::SystemMessageBuilder;
pub use task::TaskInvocation;
