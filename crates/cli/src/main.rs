use std::process::ExitCode;

fn main() -> ExitCode {
    agentdock_cli::run()
}
