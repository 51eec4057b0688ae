use agentdock_core::config::DatabaseConfig;
use agentdock_core::configs::ConfigUpdates;
use agentdock_core::domain::agent::UserId;
use agentdock_core::value::ConfigValue;
use agentdock_db::repositories::{AgentConfigRepository, SqlAgentConfigRepository};
use agentdock_db::{connect, migrations, ConfigStore, NewAgent};
use serde_json::Value;

type ContractResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

fn database_config(dir: &tempfile::TempDir) -> DatabaseConfig {
    let path = dir.path().join("agentdock.db");
    DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        max_connections: 4,
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn configs_survive_reconnect_as_json_text() -> ContractResult {
    let dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let config = database_config(&dir);
    let actor = UserId("contract".to_string());

    let pool = connect(&config).await.map_err(|error| error.to_string())?;
    migrations::run_pending(&pool).await.map_err(|error| error.to_string())?;
    let store = ConfigStore::sql(pool.clone());
    let agent = store
        .create_agent(NewAgent { name: "Contract".to_string(), ..NewAgent::default() }, &actor)
        .await
        .map_err(|error| error.to_string())?;

    let incoming: ConfigUpdates = [
        ("goals", Some(ConfigValue::from("('first', 'second')"))),
        ("instructions", Some(ConfigValue::from("be brief"))),
        ("text", Some(ConfigValue::from(""))),
        ("greeting", None),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();
    store.create_or_update(&agent.id, &incoming, &actor).await.map_err(|error| error.to_string())?;
    pool.close().await;

    let reopened = connect(&config).await.map_err(|error| error.to_string())?;
    let entries = SqlAgentConfigRepository::new(reopened.clone())
        .list_for_agent(&agent.id)
        .await
        .map_err(|error| error.to_string())?;

    require!(entries.len() == 4, "expected four stored entries, found {}", entries.len());
    for entry in &entries {
        if let Some(text) = &entry.value {
            require!(
                serde_json::from_str::<Value>(text).is_ok(),
                "value for `{}` is not json text: {text}",
                entry.key
            );
        }
    }

    let configs = ConfigStore::sql(reopened.clone())
        .agent_with_configs(&agent.id)
        .await
        .map_err(|error| error.to_string())?
        .configs
        .ok_or_else(|| "configs should be present".to_string())?;
    require!(configs.goals == ["first", "second"], "goals decoded as {:?}", configs.goals);
    require!(
        configs.instructions == ["be brief"],
        "instructions decoded as {:?}",
        configs.instructions
    );
    require!(configs.text.as_deref() == Some(""), "empty text decoded as {:?}", configs.text);
    require!(configs.greeting.is_none(), "greeting should be absent");

    reopened.close().await;
    Ok(())
}
