use agentdock_core::config::AppConfig;
use agentdock_core::configs::ConfigUpdates;
use agentdock_core::domain::agent::{AgentId, UserId};
use agentdock_core::value::ConfigValue;
use agentdock_db::{ConfigStore, NewAgent};
use clap::{Args, Subcommand};
use serde_json::Value;

use crate::commands::bootstrap::open_database;
use crate::commands::{
    build_runtime, load_config, to_data, CommandFailure, CommandResult, EXIT_INVALID_INPUT,
};

const DEFAULT_ACTOR: &str = "cli";

#[derive(Debug, Clone, Args)]
pub struct AgentArgs {
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_ACTOR,
        help = "User recorded as creator or modifier"
    )]
    pub actor: String,
    #[command(subcommand)]
    pub command: AgentCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum AgentCommand {
    #[command(about = "Create an agent or a template agent")]
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, help = "Mark the agent as a template")]
        template: bool,
    },
    #[command(about = "Realize a template into a new agent, including its runner templates")]
    FromTemplate {
        #[arg(help = "Template agent id")]
        template_id: String,
    },
    #[command(about = "Show an agent with its decoded configuration")]
    Show {
        #[arg(help = "Agent id")]
        agent_id: String,
    },
    #[command(about = "List agents")]
    List {
        #[arg(long, help = "Only list template agents")]
        templates: bool,
    },
    #[command(about = "Create or update configuration entries")]
    SetConfig {
        #[arg(help = "Agent id")]
        agent_id: String,
        #[arg(
            long = "set",
            value_name = "KEY=VALUE",
            help = "Raw value text for a key; repeatable"
        )]
        set: Vec<String>,
        #[arg(
            long = "clear",
            value_name = "KEY",
            help = "Store an empty value for a key; repeatable"
        )]
        clear: Vec<String>,
        #[arg(long, value_name = "JSON", help = "JSON object of key/value pairs")]
        json: Option<String>,
    },
}

pub fn run(args: &AgentArgs) -> CommandResult {
    let config = match load_config("agent") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("agent") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    match runtime.block_on(run_with_database(&config, args)) {
        Ok(result) => result,
        Err(failure) => failure.into_result("agent"),
    }
}

async fn run_with_database(
    config: &AppConfig,
    args: &AgentArgs,
) -> Result<CommandResult, CommandFailure> {
    let pool = open_database(config).await?;
    let store = ConfigStore::sql(pool.clone());
    let outcome = execute(&store, &UserId(args.actor.clone()), &args.command).await;
    pool.close().await;
    outcome
}

async fn execute(
    store: &ConfigStore,
    actor: &UserId,
    command: &AgentCommand,
) -> Result<CommandResult, CommandFailure> {
    match command {
        AgentCommand::Create { name, role, description, template } => {
            let agent = store
                .create_agent(
                    NewAgent {
                        name: name.clone(),
                        role: role.clone(),
                        description: description.clone(),
                        is_template: *template,
                    },
                    actor,
                )
                .await?;
            let output = store.agent_with_configs(&agent.id).await?;
            Ok(CommandResult::success_with_data(
                "agent",
                format!("created agent {}", agent.id),
                to_data(&output),
            ))
        }
        AgentCommand::FromTemplate { template_id } => {
            let agent =
                store.create_agent_from_template(&AgentId(template_id.clone()), actor).await?;
            let output = store.agent_with_configs(&agent.id).await?;
            Ok(CommandResult::success_with_data(
                "agent",
                format!("realized template {template_id} as agent {}", agent.id),
                to_data(&output),
            ))
        }
        AgentCommand::Show { agent_id } => {
            let output = store.agent_with_configs(&AgentId(agent_id.clone())).await?;
            Ok(CommandResult::success_with_data(
                "agent",
                format!("agent {agent_id}"),
                to_data(&output),
            ))
        }
        AgentCommand::List { templates } => {
            let agents = store.list_agents(*templates).await?;
            Ok(CommandResult::success_with_data(
                "agent",
                format!("{} agent(s)", agents.len()),
                to_data(&agents),
            ))
        }
        AgentCommand::SetConfig { agent_id, set, clear, json } => {
            let updates = parse_updates(set, clear, json.as_deref())?;
            let agent_id = AgentId(agent_id.clone());
            let changes = store.create_or_update(&agent_id, &updates, actor).await?;
            let output = store.agent_with_configs(&agent_id).await?;
            Ok(CommandResult::success_with_data(
                "agent",
                format!(
                    "wrote {} config entr{}",
                    changes.len(),
                    if changes.len() == 1 { "y" } else { "ies" }
                ),
                to_data(&output),
            ))
        }
    }
}

/// Later sources win: `--json`, then `--set`, then `--clear`.
fn parse_updates(
    set: &[String],
    clear: &[String],
    json: Option<&str>,
) -> Result<ConfigUpdates, CommandFailure> {
    let mut updates = ConfigUpdates::new();

    if let Some(json) = json {
        let document = serde_json::from_str::<Value>(json).map_err(|error| {
            CommandFailure::new(
                "invalid_input",
                format!("--json is not valid json: {error}"),
                EXIT_INVALID_INPUT,
            )
        })?;
        let Value::Object(fields) = document else {
            return Err(CommandFailure::new(
                "invalid_input",
                "--json must be a json object",
                EXIT_INVALID_INPUT,
            ));
        };
        for (key, value) in fields {
            updates.insert(key, ConfigValue::from_json(value));
        }
    }

    for pair in set {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(CommandFailure::new(
                "invalid_input",
                format!("--set expects KEY=VALUE, got `{pair}`"),
                EXIT_INVALID_INPUT,
            ));
        };
        updates.insert(key.trim().to_string(), Some(ConfigValue::from(value)));
    }

    for key in clear {
        updates.insert(key.trim().to_string(), None);
    }

    if updates.is_empty() {
        return Err(CommandFailure::new(
            "invalid_input",
            "no config changes given (use --set, --clear or --json)",
            EXIT_INVALID_INPUT,
        ));
    }
    Ok(updates)
}
