use crate::config::Settings;
use crate::domain::contract;
use crate::domain::recommendation::RecommendationSet;
use crate::error::{PipelineError, PipelineResult};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

#[async_trait::async_trait]
pub trait AnalysisRunner: Send + Sync {
    /// Produces a validated candidate set.
    async fn run(&self) -> PipelineResult<RecommendationSet>;
}

/// Runs the external analysis program and reads the file it stages.
#[derive(Debug, Clone)]
pub struct ScriptAnalysisRunner {
    program: String,
    args: Vec<String>,
    output_path: PathBuf,
    timeout: Duration,
}

impl ScriptAnalysisRunner {
    pub fn new(command: Vec<String>, output_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        let mut parts = command.into_iter();
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            args: parts.collect(),
            output_path: output_path.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.analysis_command.clone(),
            &settings.new_recommendations_path,
            settings.analysis_timeout,
        )
    }

    pub fn output_path(&self) -> &std::path::Path {
        &self.output_path
    }

    async fn execute(&self) -> PipelineResult<()> {
        if self.program.is_empty() {
            return Err(PipelineError::Analysis("analysis command is empty".to_string()));
        }

        // A stale file from an earlier run must not pass for this run's output.
        match tokio::fs::remove_file(&self.output_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(PipelineError::Analysis(format!(
                    "failed to clear stale {}: {e}",
                    self.output_path.display()
                )))
            }
        }

        tracing::info!(program = %self.program, args = ?self.args, "starting analysis process");

        let child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PipelineError::Analysis(format!("failed to spawn {}: {e}", self.program))
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(res) => res.map_err(|e| {
                PipelineError::Analysis(format!("failed to wait for {}: {e}", self.program))
            })?,
            Err(_) => {
                return Err(PipelineError::Analysis(format!(
                    "analysis timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::warn!(stderr = %stderr.trim(), "analysis process wrote to stderr");
        }
        tracing::debug!(stdout = %stdout.trim(), "analysis process output");

        if !output.status.success() {
            return Err(PipelineError::Analysis(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn read_output(&self) -> PipelineResult<RecommendationSet> {
        let text = tokio::fs::read_to_string(&self.output_path)
            .await
            .map_err(|e| {
                PipelineError::Analysis(format!(
                    "failed to read {}: {e}",
                    self.output_path.display()
                ))
            })?;
        contract::parse_set(&text).map_err(|e| {
            PipelineError::Analysis(format!("{}: {e}", self.output_path.display()))
        })
    }
}

#[async_trait::async_trait]
impl AnalysisRunner for ScriptAnalysisRunner {
    async fn run(&self) -> PipelineResult<RecommendationSet> {
        self.execute().await?;
        let set = self.read_output().await?;
        tracing::info!(summary = ?set.summary(), "analysis produced candidate");
        Ok(set)
    }
}
