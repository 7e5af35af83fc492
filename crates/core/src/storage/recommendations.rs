use crate::domain::contract;
use crate::domain::recommendation::RecommendationSet;
use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// The served dataset on disk: one pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct RecommendationStore {
    path: PathBuf,
}

impl RecommendationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet.
    pub async fn load(&self) -> io::Result<Option<RecommendationSet>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let set = contract::parse_set(&text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Some(set))
    }

    /// Startup read: a missing or unreadable file is logged and replaced by the empty set.
    pub async fn load_or_default(&self) -> RecommendationSet {
        match self.load().await {
            Ok(Some(set)) => {
                tracing::info!(path = %self.path.display(), summary = ?set.summary(), "loaded recommendations");
                set
            }
            Ok(None) => {
                tracing::warn!(path = %self.path.display(), "recommendations file missing; starting empty");
                RecommendationSet::default()
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "failed to load recommendations; starting empty");
                RecommendationSet::default()
            }
        }
    }

    /// Writes to a sibling temp file, fsyncs and renames over the target.
    pub async fn persist(&self, set: &RecommendationSet) -> PipelineResult<()> {
        self.write_atomic(set)
            .await
            .map_err(|e| PipelineError::persistence(&self.path, e))?;
        tracing::info!(path = %self.path.display(), summary = ?set.summary(), "persisted recommendations");
        Ok(())
    }

    async fn write_atomic(&self, set: &RecommendationSet) -> io::Result<()> {
        let body = serde_json::to_vec_pretty(set)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }

    /// Copies the current file next to itself with a timestamp suffix.
    /// Returns `None` when there is nothing to back up.
    pub async fn backup(&self, now: DateTime<Utc>) -> io::Result<Option<PathBuf>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("recommendations");
        let name = format!("{stem}_backup_{}.json", now.format("%Y%m%d_%H%M%S"));
        let target = self.path.with_file_name(name);
        tokio::fs::copy(&self.path, &target).await?;
        Ok(Some(target))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
