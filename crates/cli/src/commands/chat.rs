use std::path::PathBuf;
use std::sync::Arc;

use agentdock_agent::{
    CommandEngine, ConversationalAgent, LogChatPublisher, Turn, TurnOutcome, UnconfiguredSpeech,
};
use agentdock_core::config::AppConfig;
use agentdock_core::domain::agent::AgentId;
use agentdock_core::domain::chat::SessionId;
use agentdock_db::repositories::SqlChatHistoryRepository;
use agentdock_db::ConfigStore;
use clap::Args;
use serde_json::json;

use crate::commands::bootstrap::open_database;
use crate::commands::{build_runtime, load_config, CommandFailure, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct ChatArgs {
    #[arg(long, help = "Agent that answers the message")]
    pub agent: String,
    #[arg(long, help = "Chat session id; history is shared within a session")]
    pub session: Option<String>,
    #[arg(long, help = "Display name of the sender")]
    pub sender: Option<String>,
    #[arg(long, help = "URL of a voice recording to transcribe instead of the message text")]
    pub voice_url: Option<String>,
    #[arg(long, help = "Extra context appended to the system instructions")]
    pub context: Option<String>,
    #[arg(long, help = "Engine YAML config file (defaults to engine.config_path)")]
    pub engine_config: Option<PathBuf>,
    #[arg(help = "Message text")]
    pub message: String,
}

pub fn run(args: &ChatArgs) -> CommandResult {
    let config = match load_config("chat") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("chat") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    match runtime.block_on(execute(&config, args)) {
        Ok(outcome) => CommandResult::success_with_data(
            "chat",
            outcome.reply.clone(),
            Some(json!({
                "session_id": outcome.ai_message.session_id.0,
                "human_message_id": outcome.human_message.id.0,
                "ai_message_id": outcome.ai_message.id.0,
                "voice_url": outcome.ai_message.voice_url,
            })),
        ),
        Err(failure) => failure.into_result("chat"),
    }
}

async fn execute(config: &AppConfig, args: &ChatArgs) -> Result<TurnOutcome, CommandFailure> {
    let pool = open_database(config).await?;
    let store = ConfigStore::sql(pool.clone());
    let (agent, configs) = store.load_agent(&AgentId(args.agent.clone())).await?;

    let engine_config_path =
        args.engine_config.clone().unwrap_or_else(|| config.engine.config_path.clone());
    let conversational = ConversationalAgent::new(
        engine_config_path,
        Arc::new(CommandEngine),
        Arc::new(SqlChatHistoryRepository::new(pool.clone())),
        Arc::new(UnconfiguredSpeech),
        Arc::new(LogChatPublisher),
    )
    .with_role(config.agent.role.clone())
    .with_history_limit(config.agent.history_limit);

    let session_id = args
        .session
        .clone()
        .unwrap_or_else(|| format!("{}-{}", agent.id, chrono::Utc::now().format("%Y%m%d%H%M%S")));
    let outcome = conversational
        .run(Turn {
            session_id: SessionId(session_id),
            agent,
            configs,
            prompt: args.message.clone(),
            voice_url: args.voice_url.clone(),
            sender_name: args.sender.clone(),
            pre_retrieved_context: args.context.clone(),
        })
        .await?;

    pool.close().await;
    Ok(outcome)
}
