//! Transport shapes for agents and their configuration.
//!
//! Every field is mapped explicitly. Config rows are matched by key against a
//! fixed table; rows whose key is unknown or whose value has the wrong shape
//! are reported through `tracing` instead of vanishing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::configs::{RUNNERS_KEY, SENTIMENT_ANALYZER_KEY};
use crate::domain::agent::AgentRecord;
use crate::domain::config_entry::ConfigEntry;
use crate::value::{from_canonical_text, ConfigValue};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub id: String,
    pub name: String,
    pub role: Option<String>,
    pub description: Option<String>,
    pub is_template: bool,
    pub template_id: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AgentRecord> for AgentOutput {
    fn from(record: &AgentRecord) -> Self {
        Self {
            id: record.id.0.clone(),
            name: record.name.clone(),
            role: record.role.clone(),
            description: record.description.clone(),
            is_template: record.is_template,
            template_id: record.template_id.as_ref().map(|id| id.0.clone()),
            created_by: record.created_by.as_ref().map(|id| id.0.clone()),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigsOutput {
    pub goals: Vec<String>,
    pub constraints: Vec<String>,
    pub tools: Vec<String>,
    pub datasources: Vec<String>,
    pub instructions: Vec<String>,
    pub suggestions: Vec<String>,
    pub integrations: Vec<Value>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub greeting: Option<String>,
    pub text: Option<String>,
    pub source_flow: Option<String>,
    pub synthesizer: Option<String>,
    pub default_voice: Option<String>,
    pub voice_id: Option<String>,
    pub transcriber: Option<String>,
    pub response_mode: Vec<String>,
    pub input_mode: Vec<String>,
    pub runners: Vec<Value>,
    pub sentiment_analyzer: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentWithConfigsOutput {
    pub agent: AgentOutput,
    pub configs: Option<ConfigsOutput>,
}

impl AgentWithConfigsOutput {
    pub fn build(agent: &AgentRecord, entries: &[ConfigEntry]) -> Self {
        let configs = (!entries.is_empty()).then(|| ConfigsOutput::from_entries(entries));
        Self { agent: AgentOutput::from(agent), configs }
    }
}

impl ConfigsOutput {
    pub fn from_entries(entries: &[ConfigEntry]) -> Self {
        let mut output = Self::default();
        for entry in entries {
            let value = entry.value.clone().map(ConfigValue::Raw);
            let decoded = from_canonical_text(value.as_ref());
            output.apply(&entry.key, decoded);
        }
        output
    }

    pub fn has_response_mode(&self, mode: &str) -> bool {
        self.response_mode.iter().any(|candidate| candidate == mode)
    }

    fn apply(&mut self, key: &str, value: Option<Value>) {
        match key {
            "goals" => self.goals = string_list(key, value),
            "constraints" => self.constraints = string_list(key, value),
            "tools" => self.tools = string_list(key, value),
            "datasources" => self.datasources = string_list(key, value),
            "instructions" => self.instructions = string_list(key, value),
            "suggestions" => self.suggestions = string_list(key, value),
            "integrations" => self.integrations = value_list(key, value),
            "model" => self.model = optional_string(key, value),
            "temperature" => self.temperature = optional_number(key, value),
            "greeting" => self.greeting = optional_string(key, value),
            "text" => self.text = optional_string(key, value),
            "source_flow" => self.source_flow = optional_string(key, value),
            "synthesizer" => self.synthesizer = optional_string(key, value),
            "default_voice" => self.default_voice = optional_string(key, value),
            "voice_id" => self.voice_id = optional_string(key, value),
            "transcriber" => self.transcriber = optional_string(key, value),
            "response_mode" => self.response_mode = string_list(key, value),
            "input_mode" => self.input_mode = string_list(key, value),
            RUNNERS_KEY => self.runners = value_list(key, value),
            SENTIMENT_ANALYZER_KEY => self.sentiment_analyzer = value,
            unknown => debug!(
                event_name = "config.response.unknown_key",
                key = %unknown,
                "config entry has no field in the response shape"
            ),
        }
    }
}

fn mismatch(key: &str, expected: &'static str, value: &Value) {
    debug!(
        event_name = "config.response.type_mismatch",
        key = %key,
        expected,
        actual = %value,
        "config value does not match the response field type"
    );
}

fn string_list(key: &str, value: Option<Value>) -> Vec<String> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(single)) => vec![single],
        Some(other) => {
            mismatch(key, "list of strings", &other);
            Vec::new()
        }
    }
}

fn value_list(key: &str, value: Option<Value>) -> Vec<Value> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            mismatch(key, "list", &other);
            Vec::new()
        }
    }
}

fn optional_string(key: &str, value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => {
            mismatch(key, "string", &other);
            None
        }
    }
}

fn optional_number(key: &str, value: Option<Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => match text.trim().parse::<f64>() {
            Ok(number) => Some(number),
            Err(_) => {
                mismatch(key, "number", &Value::String(text));
                None
            }
        },
        other => {
            mismatch(key, "number", &other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AgentWithConfigsOutput, ConfigsOutput};
    use crate::domain::agent::{AgentRecord, UserId};
    use crate::domain::config_entry::ConfigEntry;

    fn entry(agent: &AgentRecord, key: &str, value: Option<&str>) -> ConfigEntry {
        let author = UserId("u".to_string());
        ConfigEntry::create(agent.id.clone(), key, value.map(str::to_string), &author)
    }

    #[test]
    fn entries_map_onto_typed_fields() {
        let agent = AgentRecord::new("Helper", None);
        let entries = vec![
            entry(&agent, "goals", Some(r#"["answer questions"]"#)),
            entry(&agent, "temperature", Some("0.7")),
            entry(&agent, "model", Some(r#""gpt-4""#)),
            entry(&agent, "response_mode", Some(r#"["Text", "Voice"]"#)),
            entry(&agent, "sentiment_analyzer", Some(r#"{"runner": "a-1"}"#)),
            entry(&agent, "runners", Some("[{'runner': 'a-2'}]")),
            entry(&agent, "greeting", None),
        ];

        let configs = ConfigsOutput::from_entries(&entries);

        assert_eq!(configs.goals, vec!["answer questions".to_string()]);
        assert_eq!(configs.temperature, Some(0.7));
        assert_eq!(configs.model.as_deref(), Some("gpt-4"));
        assert!(configs.has_response_mode("Voice"));
        assert_eq!(configs.sentiment_analyzer, Some(json!({"runner": "a-1"})));
        assert_eq!(configs.runners, vec![json!({"runner": "a-2"})]);
        assert_eq!(configs.greeting, None);
    }

    #[test]
    fn unknown_keys_and_mismatches_leave_defaults() {
        let agent = AgentRecord::new("Helper", None);
        let entries = vec![
            entry(&agent, "favourite_colour", Some(r#""blue""#)),
            entry(&agent, "goals", Some(r#"{"not": "a list"}"#)),
            entry(&agent, "temperature", Some(r#""warm""#)),
        ];

        let configs = ConfigsOutput::from_entries(&entries);

        assert_eq!(configs, ConfigsOutput::default());
    }

    #[test]
    fn agent_without_entries_has_no_configs() {
        let agent = AgentRecord::new("Bare", None);
        let output = AgentWithConfigsOutput::build(&agent, &[]);

        assert_eq!(output.agent.id, agent.id.0);
        assert_eq!(output.agent.name, "Bare");
        assert!(output.configs.is_none());
    }
}
