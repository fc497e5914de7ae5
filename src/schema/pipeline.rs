//! Four-step migration pipeline: validate, draft, apply, regenerate.
//! The staged document becomes authoritative only after every step succeeds;
//! a failure at any step leaves the committed SDL and the live database as
//! they were and surfaces the failing step with raw tool output.

use crate::error::EngineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStep {
    Validating,
    Drafting,
    Applying,
    Regenerating,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 4] = [
        PipelineStep::Validating,
        PipelineStep::Drafting,
        PipelineStep::Applying,
        PipelineStep::Regenerating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Validating => "Validating",
            PipelineStep::Drafting => "Drafting",
            PipelineStep::Applying => "Applying",
            PipelineStep::Regenerating => "Regenerating",
        }
    }
}

pub struct StepOutput {
    pub stdout: String,
    pub stderr: String,
}

pub struct StepFailure {
    pub stdout: String,
    pub stderr: String,
}

/// Seam to the external migration tooling. One method per pipeline step;
/// `apply` runs against the drafted artifact and takes no schema path.
#[async_trait]
pub trait MigrationTool: Send + Sync {
    async fn validate(&self, schema_path: &Path) -> Result<StepOutput, StepFailure>;
    async fn draft(&self, schema_path: &Path) -> Result<StepOutput, StepFailure>;
    async fn apply(&self) -> Result<StepOutput, StepFailure>;
    async fn regenerate(&self, schema_path: &Path) -> Result<StepOutput, StepFailure>;
}

/// Runs configured command lines via the OS, one per step. `{schema}` in an
/// argument is replaced with the staged schema path. Each step blocks on
/// process completion under a timeout; a timeout is a step failure, never a
/// silent retry.
pub struct CommandMigrationTool {
    pub validate_cmd: Vec<String>,
    pub draft_cmd: Vec<String>,
    pub apply_cmd: Vec<String>,
    pub regenerate_cmd: Vec<String>,
    pub step_timeout: Duration,
}

impl CommandMigrationTool {
    async fn run(&self, cmd: &[String], schema_path: Option<&Path>) -> Result<StepOutput, StepFailure> {
        let Some((program, args)) = cmd.split_first() else {
            return Err(StepFailure {
                stdout: String::new(),
                stderr: "empty command line".into(),
            });
        };
        let args: Vec<String> = args
            .iter()
            .map(|a| match schema_path {
                Some(p) => a.replace("{schema}", &p.display().to_string()),
                None => a.clone(),
            })
            .collect();
        tracing::debug!(program = %program, args = ?args, "running migration command");

        let mut command = Command::new(program);
        command.args(&args);
        let output = tokio::time::timeout(self.step_timeout, command.output()).await;
        match output {
            Err(_) => Err(StepFailure {
                stdout: String::new(),
                stderr: format!("timed out after {:?}", self.step_timeout),
            }),
            Ok(Err(e)) => Err(StepFailure {
                stdout: String::new(),
                stderr: format!("failed to spawn {}: {}", program, e),
            }),
            Ok(Ok(out)) => {
                let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
                if out.status.success() {
                    Ok(StepOutput { stdout, stderr })
                } else {
                    Err(StepFailure { stdout, stderr })
                }
            }
        }
    }
}

#[async_trait]
impl MigrationTool for CommandMigrationTool {
    async fn validate(&self, schema_path: &Path) -> Result<StepOutput, StepFailure> {
        self.run(&self.validate_cmd, Some(schema_path)).await
    }

    async fn draft(&self, schema_path: &Path) -> Result<StepOutput, StepFailure> {
        self.run(&self.draft_cmd, Some(schema_path)).await
    }

    async fn apply(&self) -> Result<StepOutput, StepFailure> {
        self.run(&self.apply_cmd, None).await
    }

    async fn regenerate(&self, schema_path: &Path) -> Result<StepOutput, StepFailure> {
        self.run(&self.regenerate_cmd, Some(schema_path)).await
    }
}

pub struct MigrationPipeline {
    tool: Box<dyn MigrationTool>,
    scratch_path: PathBuf,
}

impl MigrationPipeline {
    pub fn new(tool: Box<dyn MigrationTool>, scratch_path: PathBuf) -> Self {
        Self { tool, scratch_path }
    }

    /// Drive all four steps against a staged document. The staged text is
    /// written to a scratch path so step 1 never touches the committed file.
    /// On failure the scratch file is left in place for operator diagnosis.
    pub async fn run(&self, staged: &str) -> Result<(), EngineError> {
        if let Some(parent) = self.scratch_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.scratch_path, staged).await?;

        for step in PipelineStep::ALL {
            tracing::debug!(step = step.as_str(), "pipeline step");
            let result = match step {
                PipelineStep::Validating => self.tool.validate(&self.scratch_path).await,
                PipelineStep::Drafting => self.tool.draft(&self.scratch_path).await,
                PipelineStep::Applying => self.tool.apply().await,
                PipelineStep::Regenerating => self.tool.regenerate(&self.scratch_path).await,
            };
            if let Err(failure) = result {
                tracing::warn!(step = step.as_str(), stderr = %failure.stderr, "pipeline failed");
                return Err(EngineError::Migration {
                    step: step.as_str(),
                    stdout: failure.stdout,
                    stderr: failure.stderr,
                });
            }
        }

        let _ = tokio::fs::remove_file(&self.scratch_path).await;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Succeeds at every step except `fail_at`, recording the order steps ran in
    /// through a handle the test keeps after the tool is boxed.
    pub struct ScriptedTool {
        pub fail_at: Option<PipelineStep>,
        pub ran: Arc<Mutex<Vec<PipelineStep>>>,
    }

    impl ScriptedTool {
        pub fn succeeding() -> Self {
            Self {
                fail_at: None,
                ran: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn failing_at(step: PipelineStep) -> Self {
            Self {
                fail_at: Some(step),
                ran: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn step(&self, step: PipelineStep) -> Result<StepOutput, StepFailure> {
            self.ran.lock().unwrap().push(step);
            if self.fail_at == Some(step) {
                Err(StepFailure {
                    stdout: String::new(),
                    stderr: format!("scripted failure at {}", step.as_str()),
                })
            } else {
                Ok(StepOutput {
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
        }
    }

    #[async_trait]
    impl MigrationTool for ScriptedTool {
        async fn validate(&self, _schema_path: &Path) -> Result<StepOutput, StepFailure> {
            self.step(PipelineStep::Validating)
        }

        async fn draft(&self, _schema_path: &Path) -> Result<StepOutput, StepFailure> {
            self.step(PipelineStep::Drafting)
        }

        async fn apply(&self) -> Result<StepOutput, StepFailure> {
            self.step(PipelineStep::Applying)
        }

        async fn regenerate(&self, _schema_path: &Path) -> Result<StepOutput, StepFailure> {
            self.step(PipelineStep::Regenerating)
        }
    }
}
