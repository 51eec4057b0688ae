use thiserror::Error;

use crate::adapter::AdapterError;
use crate::engine::{EngineConfigError, EngineError};
use crate::speech::SpeechError;

/// Failures that end a turn's primary work. They are reported to the user as
/// the reply instead of being propagated.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Speech(#[from] SpeechError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    EngineConfig(#[from] EngineConfigError),
}

/// User-facing text for a failed turn. Never empty.
pub fn user_error_message(error: &TurnError) -> String {
    match error {
        TurnError::Speech(SpeechError::NotConfigured) => {
            "Voice messages are not available for this agent because speech services are not configured.".to_string()
        }
        TurnError::Speech(other) => {
            format!("Sorry, I could not process the voice message: {other}")
        }
        TurnError::EngineConfig(other) => {
            format!("The task engine is not configured correctly. Please contact an administrator. ({other})")
        }
        TurnError::Adapter(AdapterError::Engine(EngineError::Spawn { command, .. })) => {
            format!("The task engine (`{command}`) could not be started. Please contact an administrator.")
        }
        TurnError::Adapter(AdapterError::Engine(EngineError::Failed { stderr, .. }))
            if !stderr.is_empty() =>
        {
            format!("The task could not be completed: {stderr}")
        }
        TurnError::Adapter(other) => format!("The task could not be completed: {other}"),
    }
}
