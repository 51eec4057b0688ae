pub mod commands;

use agentdock_core::config::{AppConfig, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::agent::AgentArgs;
use commands::chat::ChatArgs;
use commands::normalize::NormalizeArgs;
use commands::run_task::RunTaskArgs;

#[derive(Debug, Parser)]
#[command(
    name = "agentdock",
    about = "Agentdock operator CLI",
    long_about = "Manage agents and their configuration, normalize config values, and run chat turns through the task engine.",
    after_help = "Examples:\n  agentdock migrate\n  agentdock normalize \"['a', 'b']\"\n  agentdock agent create --name Helper\n  agentdock chat --agent <id> \"summarize last week's tickets\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Show the canonical json text stored for a raw config value")]
    Normalize(NormalizeArgs),
    #[command(about = "Run one task on the engine and print its primary output")]
    RunTask(RunTaskArgs),
    #[command(about = "Send a chat message to an agent and print the reply")]
    Chat(ChatArgs),
    #[command(about = "Create, inspect and configure agents")]
    Agent(AgentArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Normalize(args) => commands::normalize::run(&args),
        Command::RunTask(args) => commands::run_task::run(&args),
        Command::Chat(args) => commands::chat::run(&args),
        Command::Agent(args) => commands::agent::run(&args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON payload. A config that
/// fails to load falls back to defaults here; the command reports the error.
fn init_logging() {
    use tracing::Level;

    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
