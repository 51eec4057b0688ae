use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use agentdock_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field<'a> {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: &'a str,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let max_connections = config.database.max_connections.to_string();
    let timeout_secs = config.database.timeout_secs.to_string();
    let engine_config_path = config.engine.config_path.display().to_string();
    let history_limit = config.agent.history_limit.to_string();
    let log_format = format!("{:?}", config.logging.format);

    let fields = [
        Field {
            key_path: "database.url",
            env_keys: &["AGENTDOCK_DATABASE_URL"],
            value: &config.database.url,
        },
        Field {
            key_path: "database.max_connections",
            env_keys: &["AGENTDOCK_DATABASE_MAX_CONNECTIONS"],
            value: &max_connections,
        },
        Field {
            key_path: "database.timeout_secs",
            env_keys: &["AGENTDOCK_DATABASE_TIMEOUT_SECS"],
            value: &timeout_secs,
        },
        Field {
            key_path: "engine.config_path",
            env_keys: &["AGENTDOCK_ENGINE_CONFIG_PATH"],
            value: &engine_config_path,
        },
        Field {
            key_path: "agent.role",
            env_keys: &["AGENTDOCK_AGENT_ROLE"],
            value: &config.agent.role,
        },
        Field {
            key_path: "agent.history_limit",
            env_keys: &["AGENTDOCK_AGENT_HISTORY_LIMIT"],
            value: &history_limit,
        },
        Field {
            key_path: "logging.level",
            env_keys: &["AGENTDOCK_LOGGING_LEVEL", "AGENTDOCK_LOG_LEVEL"],
            value: &config.logging.level,
        },
        Field {
            key_path: "logging.format",
            env_keys: &["AGENTDOCK_LOGGING_FORMAT", "AGENTDOCK_LOG_FORMAT"],
            value: &log_format,
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        lines.push(render_line(
            field.key_path,
            field.value,
            field_source(
                field.key_path,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        ));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("agentdock.toml"), PathBuf::from("config/agentdock.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
