// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backend trait: the asynchronous primitives the adapter drives.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::HealthStatus;

/// Asynchronous storage primitives that the write queue and facade build on.
///
/// Implementations decide latency and completion order. Nothing here is
/// ordered across calls; ordering per database is the write queue's job.
/// Every method reports failure through its `Result`, tagged with the
/// [`ErrorKind`](crate::ErrorKind) of the step that failed.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Handle to the resolved storage root.
    type Root: Send + Sync;

    /// Handle to one named entry under the root.
    type Entry: Send + Sync;

    /// Short name used in log fields.
    fn name(&self) -> &str;

    /// Resolves the storage root. Fails with a `Resolution` error.
    async fn resolve_root(&self) -> Result<Self::Root, StoreError>;

    /// Returns the named entry, creating an empty one if absent.
    /// Fails with an `Access` error.
    async fn get_or_create_entry(
        &self,
        root: &Self::Root,
        name: &str,
    ) -> Result<Self::Entry, StoreError>;

    /// Truncates the entry to zero length and returns the length observed
    /// afterwards. Fails with a `Write` error.
    async fn truncate(&self, entry: &Self::Entry) -> Result<u64, StoreError>;

    /// Writes `payload` at the start of a truncated entry. Fails with a
    /// `Write` error.
    async fn write(&self, entry: &Self::Entry, payload: &[u8]) -> Result<(), StoreError>;

    /// Reads the full contents. A zero-length entry is `Ok(vec![])`.
    /// Fails with a `Read` error.
    async fn read_all(&self, entry: &Self::Entry) -> Result<Vec<u8>, StoreError>;

    /// Deletes the entry. Fails with a `Delete` error.
    async fn remove(&self, entry: Self::Entry) -> Result<(), StoreError>;

    /// Resolves the root and then the named entry under it.
    async fn open_entry(&self, name: &str) -> Result<Self::Entry, StoreError> {
        let root = self.resolve_root().await?;
        self.get_or_create_entry(&root, name).await
    }

    /// Truncates, checks the entry is empty, then writes `payload`.
    ///
    /// A nonzero length after truncate is a `Write` error and the payload
    /// write is never issued.
    async fn truncate_and_write(
        &self,
        entry: &Self::Entry,
        payload: &[u8],
    ) -> Result<(), StoreError> {
        let length = self.truncate(entry).await?;
        if length > 0 {
            return Err(StoreError::write(format!(
                "unable to truncate entry, length {length}"
            )));
        }
        self.write(entry, payload).await
    }

    /// Probes the storage root.
    async fn health_check(&self) -> HealthStatus {
        match self.resolve_root().await {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        }
    }
}
