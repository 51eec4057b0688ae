use agentdock_core::value::{decode_text, to_canonical_text, ConfigValue};
use clap::Args;
use serde_json::json;

use crate::commands::{CommandResult, EXIT_INVALID_INPUT};

#[derive(Debug, Clone, Args)]
pub struct NormalizeArgs {
    #[arg(help = "Raw value text: JSON, a Python-style literal, or plain text")]
    pub value: String,
    #[arg(long, help = "Decode stored text back into a JSON value instead of encoding it")]
    pub decode: bool,
}

pub fn run(args: &NormalizeArgs) -> CommandResult {
    if args.decode {
        let decoded = decode_text(&args.value);
        return CommandResult::success_with_data(
            "normalize",
            "decoded stored text",
            Some(json!({ "decoded": decoded })),
        );
    }

    match to_canonical_text(Some(&ConfigValue::Raw(args.value.clone()))) {
        Some(canonical) => CommandResult::success_with_data(
            "normalize",
            "normalized value to canonical json text",
            Some(json!({ "canonical": canonical })),
        ),
        None => CommandResult::failure(
            "normalize",
            "invalid_input",
            "value normalized to nothing",
            EXIT_INVALID_INPUT,
        ),
    }
}
