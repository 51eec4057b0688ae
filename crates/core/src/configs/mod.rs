pub mod runners;

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::agent::{AgentId, UserId};
use crate::domain::config_entry::ConfigEntry;
use crate::errors::ApplicationError;
use crate::value::{to_canonical_text, ConfigValue};

pub use runners::{is_runner_key, RUNNERS_KEY, RUNNER_FIELD, SENTIMENT_ANALYZER_KEY};

/// Config keys accepted from agent configuration input.
pub const RECOGNIZED_CONFIG_KEYS: &[&str] = &[
    "goals",
    "constraints",
    "tools",
    "datasources",
    "instructions",
    "model",
    "temperature",
    "suggestions",
    "greeting",
    "text",
    "integrations",
    "source_flow",
    "synthesizer",
    "default_voice",
    "voice_id",
    "transcriber",
    "response_mode",
    "input_mode",
    RUNNERS_KEY,
    SENTIMENT_ANALYZER_KEY,
];

/// Incoming key/value edits. An explicit `None` clears the stored value.
pub type ConfigUpdates = BTreeMap<String, Option<ConfigValue>>;

/// Turns a template agent into a concrete one, returning the new agent's id.
#[async_trait]
pub trait AgentFactory: Send + Sync {
    async fn create_agent_from_template(
        &self,
        template_id: &AgentId,
        actor: &UserId,
        check_is_template: bool,
    ) -> Result<AgentId, ApplicationError>;
}

pub struct ReconcileContext<'a> {
    pub owner: &'a AgentId,
    pub actor: &'a UserId,
    pub factory: &'a dyn AgentFactory,
    pub check_is_template: bool,
}

impl<'a> ReconcileContext<'a> {
    pub fn new(owner: &'a AgentId, actor: &'a UserId, factory: &'a dyn AgentFactory) -> Self {
        Self { owner, actor, factory, check_is_template: true }
    }
}

/// Applies `incoming` to the owner's `existing` entries. Keys outside
/// `recognized_keys` are ignored. Returns every created or updated entry; the
/// caller commits them as one batch.
pub async fn reconcile(
    existing: &[ConfigEntry],
    incoming: &ConfigUpdates,
    recognized_keys: &[&str],
    ctx: &ReconcileContext<'_>,
) -> Result<Vec<ConfigEntry>, ApplicationError> {
    let mut changes = Vec::new();

    for key in recognized_keys {
        let Some(value) = incoming.get(*key) else {
            continue;
        };
        let normalized = normalize_entry_value(key, value.as_ref(), ctx).await?;
        debug!(
            event_name = "config.reconcile.prepared",
            owner_id = %ctx.owner,
            key = %key,
            normalized = ?normalized,
            "config value normalized"
        );

        match existing.iter().find(|entry| entry.key == *key) {
            Some(entry) => {
                let mut updated = entry.clone();
                updated.overwrite(normalized, ctx.actor);
                changes.push(updated);
            }
            None => {
                changes.push(ConfigEntry::create(ctx.owner.clone(), *key, normalized, ctx.actor));
            }
        }
    }

    let ignored = incoming.keys().filter(|key| !recognized_keys.contains(&key.as_str())).count();
    if ignored > 0 {
        debug!(
            event_name = "config.reconcile.ignored_keys",
            owner_id = %ctx.owner,
            ignored,
            "unrecognized config keys were skipped"
        );
    }

    Ok(changes)
}

/// Copies a template's entries onto `ctx.owner`, realizing any runner
/// templates they reference.
pub async fn instantiate_template_configs(
    template_entries: &[ConfigEntry],
    ctx: &ReconcileContext<'_>,
) -> Result<Vec<ConfigEntry>, ApplicationError> {
    let mut created = Vec::with_capacity(template_entries.len());
    for entry in template_entries {
        let raw = entry.value.clone().map(ConfigValue::Raw);
        let normalized = normalize_entry_value(&entry.key, raw.as_ref(), ctx).await?;
        created.push(ConfigEntry::create(
            ctx.owner.clone(),
            entry.key.clone(),
            normalized,
            ctx.actor,
        ));
    }
    Ok(created)
}

async fn normalize_entry_value(
    key: &str,
    value: Option<&ConfigValue>,
    ctx: &ReconcileContext<'_>,
) -> Result<Option<String>, ApplicationError> {
    match key {
        SENTIMENT_ANALYZER_KEY => runners::resolve_sentiment_analyzer(value, ctx).await.map(Some),
        RUNNERS_KEY => runners::resolve_runners(value, ctx).await.map(Some),
        _ => Ok(to_canonical_text(value)),
    }
}
