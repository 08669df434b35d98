//! External tool invocation
//!
//! The converter and analyzers are licensed external programs. This module
//! wraps subprocess invocation behind the narrow `ToolRunner` trait so the
//! orchestrator can be tested against a fake without spawning processes.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Placeholder in a tool argument replaced with the source file path
pub const SOURCE_PLACEHOLDER: &str = "{source}";

/// Placeholder in a tool argument replaced with the target bundle path
pub const TARGET_PLACEHOLDER: &str = "{target}";

/// One configured external tool invocation
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCommand {
    /// Program to execute
    pub command: String,
    /// Arguments; `{source}` and `{target}` are substituted per run
    #[serde(default)]
    pub args: Vec<String>,
}

/// Captured result of one tool run
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code; `None` when killed by a signal
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    /// Whether the process exited with status zero
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Tool invocation errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// Process did not finish within the bounded wait
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Process could not be started
    #[error("Failed to start {0}: {1}")]
    Spawn(String, String),
}

/// Capability to run one external tool against a source file and target path
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(
        &self,
        tool: &ToolCommand,
        source: &Path,
        target: &Path,
    ) -> Result<ToolOutput, ToolError>;
}

/// `ToolRunner` that spawns real subprocesses
///
/// Each run is awaited under a bounded timeout; a timed-out child is killed
/// rather than left running (`kill_on_drop`).
pub struct ProcessToolRunner {
    timeout: Duration,
}

impl ProcessToolRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ToolRunner for ProcessToolRunner {
    async fn run(
        &self,
        tool: &ToolCommand,
        source: &Path,
        target: &Path,
    ) -> Result<ToolOutput, ToolError> {
        let source_str = source.display().to_string();
        let target_str = target.display().to_string();
        let args: Vec<String> = tool
            .args
            .iter()
            .map(|arg| {
                arg.replace(SOURCE_PLACEHOLDER, &source_str)
                    .replace(TARGET_PLACEHOLDER, &target_str)
            })
            .collect();

        tracing::debug!(
            command = %tool.command,
            source = %source_str,
            target = %target_str,
            "Running external tool"
        );

        let child = Command::new(&tool.command)
            .args(&args)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Err(_elapsed) => return Err(ToolError::Timeout(self.timeout.as_secs())),
            Ok(Err(e)) => return Err(ToolError::Spawn(tool.command.clone(), e.to_string())),
            Ok(Ok(output)) => output,
        };

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}
