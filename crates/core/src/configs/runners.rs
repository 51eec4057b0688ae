//! Config keys whose values embed references to template agents.

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::ReconcileContext;
use crate::domain::agent::AgentId;
use crate::errors::ApplicationError;
use crate::value::{decode_structured, encode, ConfigValue};

pub const SENTIMENT_ANALYZER_KEY: &str = "sentiment_analyzer";
pub const RUNNERS_KEY: &str = "runners";
pub const RUNNER_FIELD: &str = "runner";

pub fn is_runner_key(key: &str) -> bool {
    key == SENTIMENT_ANALYZER_KEY || key == RUNNERS_KEY
}

/// `sentiment_analyzer` holds one mapping; anything else decodes to `{}`.
pub async fn resolve_sentiment_analyzer(
    value: Option<&ConfigValue>,
    ctx: &ReconcileContext<'_>,
) -> Result<String, ApplicationError> {
    let mut analyzer = match value.and_then(decode_structured) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    realize_runner(&mut analyzer, ctx).await?;
    Ok(encode(&Value::Object(analyzer)))
}

/// `runners` holds a list of mappings; anything else decodes to `[]`. Items
/// that are not mappings are kept as they are.
pub async fn resolve_runners(
    value: Option<&ConfigValue>,
    ctx: &ReconcileContext<'_>,
) -> Result<String, ApplicationError> {
    let mut runners = match value.and_then(decode_structured) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    for item in runners.iter_mut() {
        if let Value::Object(runner) = item {
            realize_runner(runner, ctx).await?;
        }
    }
    Ok(encode(&Value::Array(runners)))
}

async fn realize_runner(
    mapping: &mut Map<String, Value>,
    ctx: &ReconcileContext<'_>,
) -> Result<(), ApplicationError> {
    let template_id = match mapping.get(RUNNER_FIELD) {
        Some(Value::String(id)) if !id.trim().is_empty() => AgentId(id.clone()),
        Some(Value::Number(id)) => AgentId(id.to_string()),
        None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(()),
        Some(other) => {
            debug!(
                event_name = "config.runner.skipped",
                owner_id = %ctx.owner,
                runner = %other,
                "runner reference is not an agent id, kept as is"
            );
            return Ok(());
        }
    };

    let realized = ctx
        .factory
        .create_agent_from_template(&template_id, ctx.actor, ctx.check_is_template)
        .await?;
    info!(
        event_name = "config.runner.realized",
        owner_id = %ctx.owner,
        template_id = %template_id,
        agent_id = %realized,
        "runner template realized into a new agent"
    );
    mapping.insert(RUNNER_FIELD.to_string(), Value::String(realized.0));
    Ok(())
}
