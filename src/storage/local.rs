//! Local filesystem storage implementation.
//!
//! Every write goes to a sibling `*.tmp` file first and is renamed over the
//! target, so a crash never leaves a half-written JSON document or source
//! file behind.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{DomainRecord, EDGE_CONFIG_SHAPE, EdgeConfig, LINK_CONFIG_SHAPE, LinkConfig};
use crate::storage::{HistoryRepository, LinkConfigRepository, SourceFiles};

/// Ensure parent directory exists.
async fn ensure_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write bytes atomically (write to temp, then rename).
async fn write_bytes(path: &Path, bytes: &[u8]) -> io::Result<()> {
    ensure_dir(path).await?;

    let tmp = tmp_path(path);
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await
}

/// Read bytes, returning None if file doesn't exist.
async fn read_bytes(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write JSON data.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes(path, &bytes).await?;
    Ok(())
}

/// Read JSON data.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match read_bytes(path).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Load the rule API credentials. A missing file is `ConfigNotFound`.
pub async fn load_edge_config(path: &Path) -> Result<EdgeConfig> {
    read_json(path)
        .await?
        .ok_or_else(|| AppError::config_not_found(path, EDGE_CONFIG_SHAPE))
}

/// History log stored as one pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryRepository for HistoryFile {
    async fn load(&self) -> Result<Vec<DomainRecord>> {
        Ok(read_json(&self.path).await?.unwrap_or_default())
    }

    async fn save(&self, records: &[DomainRecord]) -> Result<()> {
        write_json(&self.path, records).await
    }
}

/// Link configuration stored as JSON.
#[derive(Debug, Clone)]
pub struct LinkConfigFile {
    path: PathBuf,
}

impl LinkConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LinkConfigRepository for LinkConfigFile {
    async fn load(&self) -> Result<LinkConfig> {
        read_json(&self.path)
            .await?
            .ok_or_else(|| AppError::config_not_found(&self.path, LINK_CONFIG_SHAPE))
    }

    async fn save(&self, config: &LinkConfig) -> Result<()> {
        write_json(&self.path, config).await
    }

    fn location(&self) -> PathBuf {
        self.path.clone()
    }
}

/// Source files on the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFiles;

#[async_trait]
impl SourceFiles for LocalFiles {
    async fn read(&self, path: &Path) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        write_bytes(path, content.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_history_loads_empty() {
        let dir = TempDir::new().unwrap();
        let history = HistoryFile::new(dir.path().join("domain_history.json"));
        assert!(history.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_save_then_load_keeps_order() {
        let dir = TempDir::new().unwrap();
        let history = HistoryFile::new(dir.path().join("nested/domain_history.json"));

        let records = vec![
            DomainRecord::first_seen("https://a.com"),
            DomainRecord::changed("https://a.com", "https://b.com"),
        ];
        history.save(&records).await.unwrap();

        assert_eq!(history.load().await.unwrap(), records);
        assert!(!dir.path().join("nested/domain_history.json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_link_config_is_config_not_found() {
        let dir = TempDir::new().unwrap();
        let repo = LinkConfigFile::new(dir.path().join("link_config.json"));

        let err = repo.load().await.unwrap_err();
        assert!(err.is_config_not_found());
        assert!(err.to_string().contains("invite_code"));
    }

    #[tokio::test]
    async fn missing_edge_config_is_config_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_edge_config(&dir.path().join("cloudflare_config.json"))
            .await
            .unwrap_err();
        assert!(err.is_config_not_found());
        assert!(err.to_string().contains("zone_id"));
    }

    #[tokio::test]
    async fn local_files_read_missing_as_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.tsx");

        assert!(LocalFiles.read(&path).await.unwrap().is_none());
        LocalFiles.write(&path, "hello").await.unwrap();
        assert_eq!(LocalFiles.read(&path).await.unwrap().as_deref(), Some("hello"));
    }
}
