//! Engine settings from environment variables. Command lines are plain
//! whitespace-split program + args; `{schema}` in an argument is replaced with
//! the staged schema path when the step runs.

use crate::schema::pipeline::{CommandMigrationTool, MigrationPipeline};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Committed SDL document.
    pub sdl_path: PathBuf,
    /// Where the pipeline writes staged documents before running the tooling.
    pub scratch_path: PathBuf,
    pub validate_cmd: Vec<String>,
    pub draft_cmd: Vec<String>,
    pub apply_cmd: Vec<String>,
    pub regenerate_cmd: Vec<String>,
    pub step_timeout: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn split_cmd(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

impl EngineConfig {
    /// Read settings from env (loading `.env` first when present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let sdl_path = PathBuf::from(env_or("SCHEMAKIT_SDL_PATH", "schema.sdl"));
        let scratch_path = std::env::var("SCHEMAKIT_SCRATCH_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| sdl_path.with_extension("staged.sdl"));
        let step_timeout = env_or("SCHEMAKIT_STEP_TIMEOUT_SECS", "120")
            .parse()
            .map(Duration::from_secs)
            .unwrap_or_else(|_| Duration::from_secs(120));
        Self {
            sdl_path,
            scratch_path,
            validate_cmd: split_cmd(&env_or(
                "SCHEMAKIT_VALIDATE_CMD",
                "npx prisma validate --schema {schema}",
            )),
            draft_cmd: split_cmd(&env_or(
                "SCHEMAKIT_DRAFT_CMD",
                "npx prisma migrate dev --create-only --skip-generate --schema {schema}",
            )),
            apply_cmd: split_cmd(&env_or("SCHEMAKIT_APPLY_CMD", "npx prisma migrate deploy")),
            regenerate_cmd: split_cmd(&env_or(
                "SCHEMAKIT_REGENERATE_CMD",
                "npx prisma generate --schema {schema}",
            )),
            step_timeout,
        }
    }

    pub fn pipeline(&self) -> MigrationPipeline {
        let tool = CommandMigrationTool {
            validate_cmd: self.validate_cmd.clone(),
            draft_cmd: self.draft_cmd.clone(),
            apply_cmd: self.apply_cmd.clone(),
            regenerate_cmd: self.regenerate_cmd.clone(),
            step_timeout: self.step_timeout,
        };
        MigrationPipeline::new(Box::new(tool), self.scratch_path.clone())
    }
}
