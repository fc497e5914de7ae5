//! SDL document store: the single committed source of truth for model blocks.
//! Readers take whole-document snapshots; only the migration pipeline commits.

use crate::error::EngineError;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

pub struct SdlStore {
    path: PathBuf,
    contents: RwLock<String>,
}

impl SdlStore {
    /// Load the committed document, creating an empty one if the file is absent.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, "").await?;
                String::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            contents: RwLock::new(contents),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the committed text. Concurrent commits after the snapshot
    /// are intentionally not reflected in the caller's view.
    pub async fn snapshot(&self) -> String {
        self.contents.read().await.clone()
    }

    /// Replace the committed document. Write-temp-then-rename keeps the file
    /// whole under crashes; the in-memory cache swaps only after the rename.
    pub async fn commit(&self, staged: &str) -> Result<(), EngineError> {
        let mut guard = self.contents.write().await;
        let tmp = self.path.with_extension("sdl.tmp");
        tokio::fs::write(&tmp, staged).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        *guard = staged.to_string();
        tracing::info!(path = %self.path.display(), bytes = staged.len(), "sdl committed");
        Ok(())
    }
}
