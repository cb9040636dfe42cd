// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Save, load, and delete named databases through a storage backend.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use lodestore_config::model::StorageConfig;
use lodestore_core::{
    entry_name, validate_database_name, DeletePolicy, DrainState, HealthStatus, StorageBackend,
    StoreError,
};

use crate::writer::{self, WriteQueue};

/// Settings that shape how the adapter names and orders entries.
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// Entries are named `<prefix>__<database>`.
    pub prefix: String,
    pub delete_policy: DeletePolicy,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

impl From<&StorageConfig> for AdapterOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
            delete_policy: config.delete_policy,
        }
    }
}

/// Future for a queued save or delete.
///
/// The operation is already queued when this value is created. Dropping it
/// does not cancel the write, it only discards the outcome.
#[must_use = "the write is queued either way; await to observe its outcome"]
pub struct PendingWrite {
    rx: oneshot::Receiver<Result<(), StoreError>>,
}

impl PendingWrite {
    fn channel() -> (Self, impl FnOnce(Result<(), StoreError>) + Send + 'static) {
        let (tx, rx) = oneshot::channel();
        let complete = move |result| {
            // The caller may have dropped the future.
            let _ = tx.send(result);
        };
        (Self { rx }, complete)
    }
}

impl Future for PendingWrite {
    type Output = Result<(), StoreError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(StoreError::aborted(
                    "write queue stopped before completing the request",
                ))
            })
        })
    }
}

/// Persistence facade for named databases.
///
/// Saves go through a per-database [`WriteQueue`], so for one name they hit
/// the backend one at a time and in call order. Loads go straight to the
/// backend. Deletes follow the configured [`DeletePolicy`].
///
/// Cloning is cheap and clones share the same queues.
pub struct DatabaseAdapter<B: StorageBackend> {
    backend: Arc<B>,
    options: AdapterOptions,
    queue: WriteQueue<B>,
}

impl<B: StorageBackend> Clone for DatabaseAdapter<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            options: self.options.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<B: StorageBackend> DatabaseAdapter<B> {
    pub fn new(backend: Arc<B>, options: AdapterOptions) -> Self {
        let queue = WriteQueue::new(Arc::clone(&backend), options.prefix.clone());
        Self {
            backend,
            options,
            queue,
        }
    }

    pub fn from_config(backend: Arc<B>, config: &StorageConfig) -> Self {
        Self::new(backend, AdapterOptions::from(config))
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn entry_name(&self, database: &str) -> String {
        entry_name(&self.options.prefix, database)
    }

    /// Queue `payload` as the new contents of `database`.
    ///
    /// The request is queued before this returns; awaiting the result only
    /// observes the outcome. Saves for one name complete in call order.
    pub fn save_database(&self, database: &str, payload: impl Into<Vec<u8>>) -> PendingWrite {
        let (pending, complete) = PendingWrite::channel();
        self.save_database_with(database, payload, complete);
        pending
    }

    /// Callback form of [`save_database`](Self::save_database).
    ///
    /// `callback` runs exactly once on a tokio task, never before this
    /// function returns.
    pub fn save_database_with<F>(&self, database: &str, payload: impl Into<Vec<u8>>, callback: F)
    where
        F: FnOnce(Result<(), StoreError>) + Send + 'static,
    {
        if let Err(e) = validate_database_name(database) {
            warn!(error = %e, "save rejected");
            tokio::spawn(async move { callback(Err(e)) });
            return;
        }

        let payload = payload.into();
        debug!(database = %database, bytes = payload.len(), "saving database");
        self.queue.enqueue(database, payload, Box::new(callback));
    }

    /// Read the contents of `database`.
    ///
    /// Returns `Ok(None)` when the entry is empty, which covers both a
    /// database that was never saved and one saved with an empty payload.
    pub async fn load_database(&self, database: &str) -> Result<Option<Vec<u8>>, StoreError> {
        validate_database_name(database)?;
        debug!(database = %database, "loading database");

        let entry = self.entry_name(database);
        let result = async {
            let handle = self.backend.open_entry(&entry).await?;
            self.backend.read_all(&handle).await
        }
        .await;

        match result {
            Ok(contents) if contents.is_empty() => {
                warn!(database = %database, "couldn't find database");
                Ok(None)
            }
            Ok(contents) => Ok(Some(contents)),
            Err(e) => {
                error!(
                    database = %database,
                    backend = self.backend.name(),
                    kind = %e.kind,
                    error = %e,
                    "load failed"
                );
                Err(e)
            }
        }
    }

    /// Callback form of [`load_database`](Self::load_database).
    pub fn load_database_with<F>(&self, database: &str, callback: F)
    where
        F: FnOnce(Result<Option<Vec<u8>>, StoreError>) + Send + 'static,
    {
        let adapter = self.clone();
        let database = database.to_string();
        tokio::spawn(async move { callback(adapter.load_database(&database).await) });
    }

    /// Remove `database` from the backend.
    ///
    /// With [`DeletePolicy::Ordered`] the delete is queued before this
    /// returns, behind saves already queued for the name and ahead of any
    /// issued afterwards. With [`DeletePolicy::Immediate`] it goes to the
    /// backend at once and may race them.
    pub fn delete_database(&self, database: &str) -> PendingWrite {
        let (pending, complete) = PendingWrite::channel();
        self.delete_database_with(database, complete);
        pending
    }

    /// Callback form of [`delete_database`](Self::delete_database).
    ///
    /// `callback` runs exactly once on a tokio task, never before this
    /// function returns.
    pub fn delete_database_with<F>(&self, database: &str, callback: F)
    where
        F: FnOnce(Result<(), StoreError>) + Send + 'static,
    {
        if let Err(e) = validate_database_name(database) {
            warn!(error = %e, "delete rejected");
            tokio::spawn(async move { callback(Err(e)) });
            return;
        }

        debug!(
            database = %database,
            policy = %self.options.delete_policy,
            "deleting database"
        );

        match self.options.delete_policy {
            DeletePolicy::Ordered => {
                self.queue.enqueue_delete(database, Box::new(callback));
            }
            DeletePolicy::Immediate => {
                let backend = Arc::clone(&self.backend);
                let entry = self.entry_name(database);
                let database = database.to_string();
                tokio::spawn(async move {
                    let result = writer::remove_entry(backend.as_ref(), &entry).await;
                    if let Err(e) = &result {
                        error!(
                            database = %database,
                            backend = backend.name(),
                            kind = %e.kind,
                            error = %e,
                            "delete failed"
                        );
                    }
                    callback(result);
                });
            }
        }
    }

    /// Wait until every queued save and delete has completed.
    pub async fn flush(&self) {
        self.queue.flush().await;
    }

    /// Operations waiting for `database`, excluding the one in flight.
    pub fn pending(&self, database: &str) -> usize {
        self.queue.pending(database)
    }

    pub fn drain_state(&self, database: &str) -> DrainState {
        self.queue.drain_state(database)
    }

    /// Probe the backend's storage root.
    pub async fn health_check(&self) -> HealthStatus {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestore_core::ErrorKind;
    use lodestore_test_utils::{BackendOp, FailPoint, MockBackend};

    fn adapter(backend: &Arc<MockBackend>, policy: DeletePolicy) -> DatabaseAdapter<MockBackend> {
        DatabaseAdapter::new(
            Arc::clone(backend),
            AdapterOptions {
                prefix: "loki".to_string(),
                delete_policy: policy,
            },
        )
    }

    #[tokio::test]
    async fn load_of_never_saved_database_is_none() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Ordered);

        assert_eq!(adapter.load_database("never-saved").await.unwrap(), None);
    }

    #[tokio::test]
    async fn load_returns_saved_payload() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Ordered);

        adapter.save_database("db", "hello").await.unwrap();
        assert_eq!(
            adapter.load_database("db").await.unwrap().as_deref(),
            Some(&b"hello"[..])
        );
    }

    #[tokio::test]
    async fn entries_are_prefixed() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Ordered);

        adapter.save_database("db", "x").await.unwrap();
        assert_eq!(backend.contents("loki__db").await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn empty_name_is_rejected_without_backend_calls() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Ordered);

        let err = adapter.save_database("", "x").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidName);
        assert_eq!(
            adapter.load_database("").await.unwrap_err().kind,
            ErrorKind::InvalidName
        );
        assert_eq!(
            adapter.delete_database("").await.unwrap_err().kind,
            ErrorKind::InvalidName
        );
        assert!(backend.ops().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_name_callback_is_deferred() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Ordered);
        let (tx, rx) = oneshot::channel();
        let called = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&called);

        adapter.save_database_with("", "x", move |r| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            let _ = tx.send(r);
        });
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
        assert!(rx.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn read_failure_is_an_error_not_a_miss() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next(FailPoint::Read, Some("loki__db")).await;
        let adapter = adapter(&backend, DeletePolicy::Ordered);

        let err = adapter.load_database("db").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Read);
    }

    #[tokio::test]
    async fn load_access_failure_propagates() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next(FailPoint::GetOrCreate, None).await;
        let adapter = adapter(&backend, DeletePolicy::Ordered);

        let err = adapter.load_database("db").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Access);
    }

    #[tokio::test]
    async fn delete_then_load_is_none() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Ordered);

        adapter.save_database("db", "data").await.unwrap();
        adapter.delete_database("db").await.unwrap();
        assert_eq!(adapter.load_database("db").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ordered_delete_is_queued_at_call_time() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Ordered);
        adapter.save_database("db", "old").await.unwrap();

        let delete = adapter.delete_database("db");
        let save = adapter.save_database("db", "new");
        let (deleted, saved) = tokio::join!(delete, save);
        deleted.unwrap();
        saved.unwrap();

        assert_eq!(
            adapter.load_database("db").await.unwrap().as_deref(),
            Some(&b"new"[..])
        );
    }

    #[tokio::test]
    async fn ordered_delete_callback_is_queued_at_call_time() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Ordered);
        adapter.save_database("db", "old").await.unwrap();

        let (tx, rx) = oneshot::channel();
        adapter.delete_database_with("db", move |r| {
            let _ = tx.send(r);
        });
        assert_eq!(adapter.drain_state("db"), DrainState::Draining);
        adapter.save_database("db", "new").await.unwrap();
        rx.await.unwrap().unwrap();

        assert_eq!(backend.contents("loki__db").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn immediate_delete_bypasses_queue() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Immediate);

        backend.pause_writes();
        let save = adapter.save_database("db", "late");
        adapter.delete_database("db").await.unwrap();
        assert_eq!(adapter.drain_state("db"), DrainState::Draining);

        backend.resume_writes();
        save.await.unwrap();

        // The save landed after the delete, so the data is back.
        let ops = backend.ops().await;
        let remove_at = ops
            .iter()
            .position(|op| matches!(op, BackendOp::Remove(_)))
            .unwrap();
        let write_at = ops
            .iter()
            .position(|op| matches!(op, BackendOp::Write { .. }))
            .unwrap();
        assert!(remove_at < write_at);
        assert_eq!(backend.contents("loki__db").await.unwrap(), b"late");
    }

    #[tokio::test]
    async fn delete_failure_is_returned() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next(FailPoint::Remove, None).await;
        let adapter = adapter(&backend, DeletePolicy::Immediate);

        let err = adapter.delete_database("db").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Delete);
    }

    #[tokio::test]
    async fn callback_forms_deliver_results() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Ordered);

        let (tx, rx) = oneshot::channel();
        adapter.save_database_with("db", "cb", move |r| {
            let _ = tx.send(r);
        });
        rx.await.unwrap().unwrap();

        let (tx, rx) = oneshot::channel();
        adapter.load_database_with("db", move |r| {
            let _ = tx.send(r);
        });
        assert_eq!(rx.await.unwrap().unwrap().as_deref(), Some(&b"cb"[..]));

        let (tx, rx) = oneshot::channel();
        adapter.delete_database_with("db", move |r| {
            let _ = tx.send(r);
        });
        rx.await.unwrap().unwrap();
        assert!(backend.contents("loki__db").await.is_none());
    }

    #[tokio::test]
    async fn dropped_pending_write_still_commits() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Ordered);

        drop(adapter.save_database("db", "fire and forget"));
        adapter.flush().await;
        assert_eq!(
            backend.contents("loki__db").await.unwrap(),
            b"fire and forget"
        );
    }

    #[tokio::test]
    async fn health_check_reports_unhealthy_root() {
        let backend = Arc::new(MockBackend::new());
        let adapter = adapter(&backend, DeletePolicy::Ordered);
        assert_eq!(adapter.health_check().await, HealthStatus::Healthy);

        backend.fail_next(FailPoint::ResolveRoot, None).await;
        assert!(matches!(
            adapter.health_check().await,
            HealthStatus::Unhealthy(_)
        ));
    }
}
