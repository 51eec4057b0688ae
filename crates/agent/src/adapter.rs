//! Runs one task on the engine and turns its workspace into a reply.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;
use tracing::info;

use crate::engine::{EngineError, EngineRequest, LoadedEngineConfig, TaskEngine, DEFAULT_ROLE};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("engine task was aborted: {0}")]
    Join(String),
    #[error("could not read engine output `{path}`: {source}")]
    ReadOutput { path: PathBuf, source: std::io::Error },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputSource {
    File(String),
    NoOutput { directory: PathBuf },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineResult {
    pub text: String,
    pub source: OutputSource,
}

#[derive(Clone)]
pub struct TaskAdapter {
    config: Arc<LoadedEngineConfig>,
    engine: Arc<dyn TaskEngine>,
    role: String,
}

impl TaskAdapter {
    pub fn new(config: LoadedEngineConfig, engine: Arc<dyn TaskEngine>) -> Self {
        Self { config: Arc::new(config), engine, role: DEFAULT_ROLE.to_string() }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Blocks a worker thread for as long as the engine runs. There is no
    /// timeout.
    pub async fn run(&self, task: &str) -> Result<EngineResult, AdapterError> {
        let config = Arc::clone(&self.config);
        let engine = Arc::clone(&self.engine);
        let request = EngineRequest::new(task).with_role(self.role.clone());

        info!(
            event_name = "engine.run.started",
            task_len = request.task.len(),
            role = %request.role,
            "dispatching task to engine"
        );
        let record = tokio::task::spawn_blocking(move || engine.run(&config, &request))
            .await
            .map_err(|error| AdapterError::Join(error.to_string()))??;

        let result = collect_output(&record.output_dir)?;
        info!(
            event_name = "engine.run.finished",
            output_dir = %record.output_dir.display(),
            source = ?result.source,
            "engine task finished"
        );
        Ok(result)
    }
}

/// Picks the primary output of a run directory. The newest `*report*.md` file
/// wins, then the newest file of any kind. Subdirectories are not searched.
pub fn collect_output(dir: &Path) -> Result<EngineResult, AdapterError> {
    let files = list_files(dir);
    let report = newest(files.iter().filter(|file| is_report(&file.name)));
    let Some(chosen) = report.or_else(|| newest(files.iter())) else {
        return Ok(EngineResult {
            text: format!(
                "Task completed successfully. No specific output file was found. Please check the workspace for all outputs at: {}",
                dir.display()
            ),
            source: OutputSource::NoOutput { directory: dir.to_path_buf() },
        });
    };

    let content = fs::read_to_string(&chosen.path)
        .map_err(|source| AdapterError::ReadOutput { path: chosen.path.clone(), source })?;
    Ok(EngineResult {
        text: format!(
            "Task completed. The primary output file is '{}'.\n\n--- FILE CONTENT ---\n{content}",
            chosen.name
        ),
        source: OutputSource::File(chosen.name.clone()),
    })
}

struct OutputFile {
    name: String,
    path: PathBuf,
    modified: SystemTime,
}

fn list_files(dir: &Path) -> Vec<OutputFile> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            Some(OutputFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            })
        })
        .collect()
}

fn is_report(name: &str) -> bool {
    name.to_lowercase().contains("report") && name.ends_with(".md")
}

// Ties on mtime go to the lexically greatest name so the choice is stable.
fn newest<'a>(files: impl Iterator<Item = &'a OutputFile>) -> Option<&'a OutputFile> {
    files.max_by(|left, right| {
        left.modified.cmp(&right.modified).then_with(|| left.name.cmp(&right.name))
    })
}
