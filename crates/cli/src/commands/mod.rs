pub mod agent;
pub mod bootstrap;
pub mod chat;
pub mod config;
pub mod migrate;
pub mod normalize;
pub mod run_task;

use agentdock_core::config::{AppConfig, LoadOptions};
use agentdock_core::errors::{ApplicationError, DomainError};
use serde::Serialize;
use serde_json::Value;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DATABASE: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_INVALID_INPUT: u8 = 6;
pub const EXIT_NOT_FOUND: u8 = 7;
pub const EXIT_ENGINE: u8 = 8;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// A failed step inside a command, before it is rendered as output.
#[derive(Debug)]
pub struct CommandFailure {
    pub error_class: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl CommandFailure {
    pub fn new(error_class: &'static str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { error_class, message: message.into(), exit_code }
    }

    pub fn into_result(self, command: &str) -> CommandResult {
        CommandResult::failure(command, self.error_class, self.message, self.exit_code)
    }
}

impl From<ApplicationError> for CommandFailure {
    fn from(error: ApplicationError) -> Self {
        match &error {
            ApplicationError::Domain(DomainError::AgentNotFound(_)) => {
                Self::new("not_found", error.to_string(), EXIT_NOT_FOUND)
            }
            ApplicationError::Domain(_) => {
                Self::new("invalid_input", error.to_string(), EXIT_INVALID_INPUT)
            }
            ApplicationError::Persistence(_) => {
                Self::new("persistence", error.to_string(), EXIT_DATABASE)
            }
            ApplicationError::Integration(_) => {
                Self::new("integration", error.to_string(), EXIT_ENGINE)
            }
            ApplicationError::Configuration(_) => {
                Self::new("config_validation", error.to_string(), EXIT_CONFIG)
            }
        }
    }
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

pub(crate) fn to_data<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use agentdock_core::errors::{ApplicationError, DomainError};
    use serde_json::{json, Value};

    use super::{CommandFailure, CommandResult, EXIT_NOT_FOUND};

    #[test]
    fn success_payload_includes_data_only_when_present() {
        let plain: Value =
            serde_json::from_str(&CommandResult::success("migrate", "done").output).expect("json");
        assert!(plain.get("data").is_none());

        let with_data: Value = serde_json::from_str(
            &CommandResult::success_with_data("normalize", "ok", Some(json!({"canonical": "[]"})))
                .output,
        )
        .expect("json");
        assert_eq!(with_data["data"]["canonical"], "[]");
        assert_eq!(with_data["error_class"], Value::Null);
    }

    #[test]
    fn missing_agents_map_to_not_found() {
        let failure = CommandFailure::from(ApplicationError::from(DomainError::AgentNotFound(
            "a-1".to_string(),
        )));
        assert_eq!(failure.error_class, "not_found");
        assert_eq!(failure.exit_code, EXIT_NOT_FOUND);
    }
}
