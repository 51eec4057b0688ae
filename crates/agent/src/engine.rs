//! Boundary to the external task engine.
//!
//! The engine reads its own YAML configuration. [`EngineConfig::load`] is the
//! only way to obtain a [`LoadedEngineConfig`], and every engine run takes one,
//! so the configuration is always in place before the engine is used.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

pub const CONFIG_FILE_ENV: &str = "CONFIG_FILE";
pub const RECORD_DIR_ENV: &str = "AGENTDOCK_RECORD_DIR";
pub const DEFAULT_ROLE: &str = "Assistant";

#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error("could not read engine config `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse engine config `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },
    #[error("engine config `{path}` is invalid: {message}")]
    Invalid { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not prepare run directory `{path}`: {source}")]
    Workspace { path: PathBuf, source: std::io::Error },
    #[error("could not start engine command `{command}`: {source}")]
    Spawn { command: String, source: std::io::Error },
    #[error("engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// The keys this crate reads from the engine's config file. Everything else in
/// the file belongs to the engine and is ignored here.
#[derive(Clone, Debug, Deserialize)]
pub struct EngineConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_record_root_dir")]
    pub record_root_dir: PathBuf,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_record_root_dir() -> PathBuf {
    PathBuf::from("running_records")
}

#[derive(Clone, Debug)]
pub struct LoadedEngineConfig {
    path: PathBuf,
    config: EngineConfig,
}

impl EngineConfig {
    /// Reads the file once. A relative `record_root_dir` is resolved against
    /// the directory holding the config file.
    pub fn load(path: impl AsRef<Path>) -> Result<LoadedEngineConfig, EngineConfigError> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path)
            .map_err(|source| EngineConfigError::Read { path: path.clone(), source })?;
        let mut config = serde_yaml::from_str::<EngineConfig>(&raw)
            .map_err(|source| EngineConfigError::Parse { path: path.clone(), source })?;

        if config.command.trim().is_empty() {
            return Err(EngineConfigError::Invalid {
                path,
                message: "`command` must name the engine executable".to_string(),
            });
        }
        if config.record_root_dir.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.record_root_dir = base.join(&config.record_root_dir);
        }

        info!(
            event_name = "engine.config.loaded",
            path = %path.display(),
            command = %config.command,
            record_root_dir = %config.record_root_dir.display(),
            "engine configuration loaded"
        );
        Ok(LoadedEngineConfig { path, config })
    }
}

impl LoadedEngineConfig {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineMode {
    /// Runs without asking for human input.
    Auto,
    Manual,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineRequest {
    pub task: String,
    pub role: String,
    pub mode: EngineMode,
}

impl EngineRequest {
    pub fn new(task: impl Into<String>) -> Self {
        Self { task: task.into(), role: DEFAULT_ROLE.to_string(), mode: EngineMode::Auto }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }
}

/// What a finished run leaves behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunRecord {
    pub output_dir: PathBuf,
}

/// A blocking engine invocation. Callers on an async runtime must move it off
/// the reactor threads.
pub trait TaskEngine: Send + Sync {
    fn run(
        &self,
        config: &LoadedEngineConfig,
        request: &EngineRequest,
    ) -> Result<RunRecord, EngineError>;
}

/// Runs the engine as a child process in a fresh directory under
/// `record_root_dir`.
#[derive(Clone, Debug, Default)]
pub struct CommandEngine;

impl TaskEngine for CommandEngine {
    fn run(
        &self,
        config: &LoadedEngineConfig,
        request: &EngineRequest,
    ) -> Result<RunRecord, EngineError> {
        let engine = config.config();
        let output_dir = engine.record_root_dir.join(run_dir_name());
        fs::create_dir_all(&output_dir)
            .map_err(|source| EngineError::Workspace { path: output_dir.clone(), source })?;

        debug!(
            event_name = "engine.command.started",
            command = %engine.command,
            role = %request.role,
            mode = request.mode.as_str(),
            output_dir = %output_dir.display(),
            "starting engine command"
        );

        let output = Command::new(&engine.command)
            .args(&engine.args)
            .arg("--task")
            .arg(&request.task)
            .arg("--role")
            .arg(&request.role)
            .arg("--mode")
            .arg(request.mode.as_str())
            .arg("--config-file")
            .arg(config.path())
            .arg("--record-dir")
            .arg(&output_dir)
            .envs(&engine.env)
            .env(CONFIG_FILE_ENV, config.path())
            .env(RECORD_DIR_ENV, &output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| EngineError::Spawn { command: engine.command.clone(), source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EngineError::Failed { status: output.status.to_string(), stderr });
        }

        debug!(
            event_name = "engine.command.finished",
            output_dir = %output_dir.display(),
            stdout_bytes = output.stdout.len(),
            "engine command finished"
        );
        Ok(RunRecord { output_dir })
    }
}

fn run_dir_name() -> String {
    let stamp = chrono::Utc::now().format("%Y_%m_%d_%H_%M_%S");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{stamp}_{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{EngineConfig, EngineConfigError, EngineMode, EngineRequest};

    fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("xagent_config.yml");
        fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn load_reads_known_keys_and_ignores_the_rest() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(
            &dir,
            "command: xagent\nargs: [run]\nrecord_root_dir: records\nmax_subtask_chain_length: 15\n",
        );

        let loaded = EngineConfig::load(&path).expect("load");

        assert_eq!(loaded.path(), path.as_path());
        assert_eq!(loaded.config().command, "xagent");
        assert_eq!(loaded.config().args, vec!["run".to_string()]);
        assert_eq!(loaded.config().record_root_dir, dir.path().join("records"));
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = TempDir::new().expect("tempdir");

        let missing = EngineConfig::load(dir.path().join("absent.yml"));
        assert!(matches!(missing, Err(EngineConfigError::Read { .. })));

        let malformed = EngineConfig::load(write_config(&dir, "command: [unclosed\n"));
        assert!(matches!(malformed, Err(EngineConfigError::Parse { .. })));

        let blank = EngineConfig::load(write_config(&dir, "command: '  '\n"));
        assert!(matches!(blank, Err(EngineConfigError::Invalid { .. })));
    }

    #[test]
    fn requests_default_to_autonomous_assistant() {
        let request = EngineRequest::new("summarize");
        assert_eq!(request.role, "Assistant");
        assert_eq!(request.mode, EngineMode::Auto);
        assert_eq!(request.with_role("Researcher").role, "Researcher");
    }

    #[cfg(unix)]
    #[test]
    fn command_engine_runs_in_a_fresh_record_directory() {
        use super::{CommandEngine, EngineError, TaskEngine};

        let dir = TempDir::new().expect("tempdir");
        let path = write_config(
            &dir,
            "command: sh\nargs:\n  - -c\n  - 'printf \"%s\" \"$2\" > \"$AGENTDOCK_RECORD_DIR/report.md\"'\n  - engine\n",
        );
        let loaded = EngineConfig::load(&path).expect("load");

        let record =
            CommandEngine.run(&loaded, &EngineRequest::new("write a report")).expect("run");
        assert!(record.output_dir.starts_with(dir.path().join("running_records")));
        assert_eq!(
            fs::read_to_string(record.output_dir.join("report.md")).expect("report"),
            "write a report"
        );

        let failing = write_config(&dir, "command: sh\nargs: ['-c', 'echo broken >&2; exit 3']\n");
        let loaded = EngineConfig::load(&failing).expect("load");
        let result = CommandEngine.run(&loaded, &EngineRequest::new("anything"));
        assert!(matches!(
            result,
            Err(EngineError::Failed { ref stderr, .. }) if stderr == "broken"
        ));
    }
}
