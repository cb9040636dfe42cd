// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem implementation of the StorageBackend trait.
//!
//! Each entry is one file directly under the root directory.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use lodestore_config::model::StorageConfig;
use lodestore_core::{StorageBackend, StoreError};

/// Directory name used under the platform data directory.
const DEFAULT_DIR_NAME: &str = "lodestore";

/// Stores each entry as a file under a root directory.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
    sync_on_write: bool,
}

impl FsBackend {
    /// Create a backend rooted at `root`. The directory is created on first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sync_on_write: true,
        }
    }

    /// Whether to `fsync` after each payload write.
    pub fn with_sync_on_write(mut self, sync_on_write: bool) -> Self {
        self.sync_on_write = sync_on_write;
        self
    }

    /// Build a backend from configuration.
    ///
    /// Falls back to the platform data directory when `root_dir` is unset,
    /// and fails with a `Resolution` error if the platform has none.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        let root = match &config.root_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|d| d.join(DEFAULT_DIR_NAME))
                .ok_or_else(|| {
                    StoreError::resolution("no platform data directory; set storage.root_dir")
                })?,
        };
        Ok(Self::new(root).with_sync_on_write(config.sync_on_write))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Entry names map to a single file name; anything that could leave the
/// root is refused.
fn check_entry_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(StoreError::access(format!(
            "entry name `{name}` is not a valid file name"
        )));
    }
    Ok(())
}

#[async_trait]
impl StorageBackend for FsBackend {
    type Root = PathBuf;
    type Entry = PathBuf;

    fn name(&self) -> &str {
        "fs"
    }

    async fn resolve_root(&self) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            StoreError::resolution(format!(
                "unable to resolve storage root {}",
                self.root.display()
            ))
            .with_source(e)
        })?;
        Ok(self.root.clone())
    }

    async fn get_or_create_entry(&self, root: &PathBuf, name: &str) -> Result<PathBuf, StoreError> {
        check_entry_name(name)?;
        let path = root.join(name);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                StoreError::access(format!("unable to get entry {}", path.display()))
                    .with_source(e)
            })?;
        Ok(path)
    }

    async fn truncate(&self, entry: &PathBuf) -> Result<u64, StoreError> {
        let write_err = |e: io::Error| {
            StoreError::write(format!("unable to truncate {}", entry.display())).with_source(e)
        };
        let file = OpenOptions::new()
            .write(true)
            .open(entry)
            .await
            .map_err(write_err)?;
        file.set_len(0).await.map_err(write_err)?;
        let length = file.metadata().await.map_err(write_err)?.len();
        Ok(length)
    }

    async fn write(&self, entry: &PathBuf, payload: &[u8]) -> Result<(), StoreError> {
        let write_err = |e: io::Error| {
            StoreError::write(format!("unable to write {}", entry.display())).with_source(e)
        };
        let mut file = OpenOptions::new()
            .write(true)
            .open(entry)
            .await
            .map_err(write_err)?;
        file.write_all(payload).await.map_err(write_err)?;
        if self.sync_on_write {
            file.sync_all().await.map_err(write_err)?;
        } else {
            file.flush().await.map_err(write_err)?;
        }
        Ok(())
    }

    async fn read_all(&self, entry: &PathBuf) -> Result<Vec<u8>, StoreError> {
        fs::read(entry).await.map_err(|e| {
            StoreError::read(format!("unable to read {}", entry.display())).with_source(e)
        })
    }

    async fn remove(&self, entry: PathBuf) -> Result<(), StoreError> {
        match fs::remove_file(&entry).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(entry = %entry.display(), "entry already gone");
                Ok(())
            }
            Err(e) => Err(
                StoreError::delete(format!("unable to delete {}", entry.display())).with_source(e),
            ),
        }
    }
}
