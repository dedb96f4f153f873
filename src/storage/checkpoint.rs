use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{CrawlError, Result};
use crate::storage::{ResultLayout, ResultSet};

/// Durable target for crawl progress
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Replace the stored checkpoint with the full result set
    async fn flush(&self, results: &ResultSet) -> Result<()>;

    /// Where the checkpoint lives, for messages
    fn location(&self) -> String;
}

/// Whole-file JSON checkpoint, replaced atomically on every flush
pub struct JsonCheckpoint {
    path: PathBuf,
    layout: ResultLayout,
}

impl JsonCheckpoint {
    pub fn new(path: impl Into<PathBuf>, layout: ResultLayout) -> Self {
        Self {
            path: path.into(),
            layout,
        }
    }

    /// Delete a checkpoint left over from an earlier run.
    /// Returns whether a file was removed.
    pub async fn reset(&self) -> Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Old data file {} removed. Starting fresh.", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.persistence(e)),
        }
    }

    /// Read a checkpoint back, in either layout
    pub async fn load(path: &Path) -> Result<ResultSet> {
        let bytes = tokio::fs::read(path).await.map_err(|source| CrawlError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        ResultSet::from_json(&bytes)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn persistence(&self, source: std::io::Error) -> CrawlError {
        CrawlError::Persistence {
            path: self.path.clone(),
            source,
        }
    }

    /// Write to a sibling temp file, then rename over the destination
    async fn write_atomic(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.temp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for JsonCheckpoint {
    async fn flush(&self, results: &ResultSet) -> Result<()> {
        let bytes = results.to_json(self.layout)?;
        self.write_atomic(&bytes)
            .await
            .map_err(|e| self.persistence(e))?;

        debug!("Wrote {} pages to {}", results.len(), self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::record::{Metadata, PageRecord};
    use crate::crawler::url::normalize;
    use tempfile::TempDir;

    fn results(urls: &[&str]) -> ResultSet {
        let mut set = ResultSet::new();
        for url in urls {
            set.push(PageRecord::new(
                normalize(url),
                Metadata::default(),
                "text".to_string(),
                "<html></html>".to_string(),
                &[],
            ));
        }
        set
    }

    #[tokio::test]
    async fn test_flush_replaces_previous_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("scraped_data.json");
        let checkpoint = JsonCheckpoint::new(&path, ResultLayout::Array);

        checkpoint.flush(&results(&["https://example.com/"])).await.unwrap();
        checkpoint
            .flush(&results(&["https://example.com/", "https://example.com/about"]))
            .await
            .unwrap();

        let loaded = JsonCheckpoint::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(!checkpoint.temp_path().exists());
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_previous_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scraped_data.json");
        let checkpoint = JsonCheckpoint::new(&path, ResultLayout::Array);
        checkpoint.flush(&results(&["https://example.com/"])).await.unwrap();

        // A directory squatting on the temp path makes the write fail
        std::fs::create_dir(checkpoint.temp_path()).unwrap();
        let err = checkpoint
            .flush(&results(&["https://example.com/", "https://example.com/b"]))
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::Persistence { .. }));
        assert_eq!(JsonCheckpoint::load(&path).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_removes_old_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scraped_data.json");
        let checkpoint = JsonCheckpoint::new(&path, ResultLayout::Map);

        assert!(!checkpoint.reset().await.unwrap());
        checkpoint.flush(&ResultSet::new()).await.unwrap();
        assert!(path.exists());
        assert!(checkpoint.reset().await.unwrap());
        assert!(!path.exists());
    }
}
