use std::path::PathBuf;
use std::sync::Arc;

use agentdock_agent::{CommandEngine, EngineConfig, EngineResult, OutputSource, TaskAdapter};
use agentdock_core::config::AppConfig;
use anyhow::Context;
use clap::Args;
use serde_json::json;

use crate::commands::{build_runtime, load_config, CommandResult, EXIT_ENGINE};

#[derive(Debug, Clone, Args)]
pub struct RunTaskArgs {
    #[arg(help = "Task text handed to the engine verbatim")]
    pub task: String,
    #[arg(long, help = "Engine YAML config file (defaults to engine.config_path)")]
    pub engine_config: Option<PathBuf>,
}

pub fn run(args: &RunTaskArgs) -> CommandResult {
    let config = match load_config("run-task") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("run-task") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    match runtime.block_on(execute(&config, args)) {
        Ok(result) => {
            let source = match &result.source {
                OutputSource::File(name) => json!({ "file": name }),
                OutputSource::NoOutput { directory } => {
                    json!({ "no_output": directory.display().to_string() })
                }
            };
            CommandResult::success_with_data(
                "run-task",
                result.text,
                Some(json!({ "source": source })),
            )
        }
        Err(error) => {
            CommandResult::failure("run-task", "engine", format!("{error:#}"), EXIT_ENGINE)
        }
    }
}

async fn execute(config: &AppConfig, args: &RunTaskArgs) -> anyhow::Result<EngineResult> {
    let path = args.engine_config.clone().unwrap_or_else(|| config.engine.config_path.clone());
    let engine_config =
        EngineConfig::load(&path).context("engine configuration could not be loaded")?;
    let adapter = TaskAdapter::new(engine_config, Arc::new(CommandEngine))
        .with_role(config.agent.role.clone());
    adapter.run(&args.task).await.context("engine task failed")
}
