//! Storage abstractions for watcher persistence.
//!
//! Everything the watcher writes lives in plain files:
//!
//! ```text
//! storage/
//! ├── config.toml              # Watcher settings
//! ├── domain_history.json      # History log (rewritten in full on append)
//! ├── link_config.json         # Link configuration for the file sink
//! └── cloudflare_config.json   # Rule API credentials
//! ```
//!
//! The patched source files live in the publish repository, not here, but
//! go through [`SourceFiles`] so a batch can be exercised against failures.

pub mod local;

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DomainRecord, LinkConfig};

// Re-export for convenience
pub use local::{HistoryFile, LinkConfigFile, LocalFiles, load_edge_config};

/// Load/save access to the history log.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Load all records in append order. A missing log is empty.
    async fn load(&self) -> Result<Vec<DomainRecord>>;

    /// Replace the stored log with `records`.
    async fn save(&self, records: &[DomainRecord]) -> Result<()>;
}

/// Load/save access to the link configuration.
#[async_trait]
pub trait LinkConfigRepository: Send + Sync {
    /// Load the configuration. A missing file is `ConfigNotFound`.
    async fn load(&self) -> Result<LinkConfig>;

    /// Persist the configuration.
    async fn save(&self, config: &LinkConfig) -> Result<()>;

    /// Where the configuration lives, so it can be committed with the files.
    fn location(&self) -> PathBuf;
}

/// Whole-file access to the source files being patched.
#[async_trait]
pub trait SourceFiles: Send + Sync {
    /// Read a file as UTF-8, `None` if it does not exist.
    async fn read(&self, path: &Path) -> io::Result<Option<String>>;

    /// Replace a file's full content.
    async fn write(&self, path: &Path, content: &str) -> io::Result<()>;
}
