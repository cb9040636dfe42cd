// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-database single-writer queue.
//!
//! Every save for a database name goes through [`WriteQueue`]. Requests for
//! one name reach the backend one at a time, in the order they were
//! enqueued. Different names drain independently.
//!
//! The queue map and the set of draining names live behind one
//! `std::sync::Mutex` that is never held across an `.await`. `enqueue`
//! and the drain task's "pop or go idle" step both run under that lock, so
//! an enqueue can never see a name as idle while its drain task still owns
//! it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, error};

use lodestore_core::{entry_name, DrainState, StorageBackend, StoreError};

/// Callback that receives the outcome of one queued operation.
///
/// Invoked exactly once, from the drain task, never from the caller of
/// `enqueue`.
pub type Completion = Box<dyn FnOnce(Result<(), StoreError>) + Send + 'static>;

/// A queued save. Immutable once created; consumed when its completion fires.
pub struct SaveRequest {
    pub database: String,
    pub payload: Vec<u8>,
    completion: Completion,
}

/// A queued delete, used when deletes are ordered with saves.
pub struct DeleteRequest {
    pub database: String,
    completion: Completion,
}

enum QueuedOp {
    Save(SaveRequest),
    Delete(DeleteRequest),
}

#[derive(Default)]
struct QueueState {
    queues: HashMap<String, VecDeque<QueuedOp>>,
    /// Names with a drain task in flight.
    active: HashSet<String>,
}

struct Shared<B: StorageBackend> {
    backend: Arc<B>,
    prefix: String,
    state: Mutex<QueueState>,
    idle: Notify,
}

impl<B: StorageBackend> Shared<B> {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Completions run outside the lock, so a poisoned guard still holds
        // consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pop the next operation for `database`, or mark it idle.
    fn next_op(&self, database: &str) -> Option<QueuedOp> {
        let mut state = self.lock();
        if let Some(op) = state.queues.get_mut(database).and_then(VecDeque::pop_front) {
            return Some(op);
        }
        state.queues.remove(database);
        state.active.remove(database);
        if state.active.is_empty() {
            self.idle.notify_waiters();
        }
        None
    }

    async fn run_save(&self, database: &str, payload: &[u8]) -> Result<(), StoreError> {
        let entry = entry_name(&self.prefix, database);
        save_entry(self.backend.as_ref(), &entry, payload).await
    }

    async fn run_delete(&self, database: &str) -> Result<(), StoreError> {
        let entry = entry_name(&self.prefix, database);
        remove_entry(self.backend.as_ref(), &entry).await
    }
}

/// Ordered, single-flight write queue keyed by database name.
///
/// Owned by one adapter instance. Queues and drain state are created lazily
/// per name and discarded when a drain finds its queue empty.
pub struct WriteQueue<B: StorageBackend> {
    shared: Arc<Shared<B>>,
}

impl<B: StorageBackend> Clone for WriteQueue<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: StorageBackend> WriteQueue<B> {
    /// Create an empty queue writing entries named `<prefix>__<database>`.
    pub fn new(backend: Arc<B>, prefix: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                prefix: prefix.into(),
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
            }),
        }
    }

    /// Append a save for `database` and start draining it if idle.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime and `database` is idle,
    /// since the drain task has to be spawned.
    pub fn enqueue(&self, database: &str, payload: Vec<u8>, completion: Completion) {
        self.push(
            database,
            QueuedOp::Save(SaveRequest {
                database: database.to_string(),
                payload,
                completion,
            }),
        );
    }

    /// Append a delete for `database` behind any saves already queued.
    pub fn enqueue_delete(&self, database: &str, completion: Completion) {
        self.push(
            database,
            QueuedOp::Delete(DeleteRequest {
                database: database.to_string(),
                completion,
            }),
        );
    }

    fn push(&self, database: &str, op: QueuedOp) {
        let start = {
            let mut state = self.shared.lock();
            state
                .queues
                .entry(database.to_string())
                .or_default()
                .push_back(op);
            state.active.insert(database.to_string())
        };

        if start {
            debug!(database = %database, "write queue draining");
            tokio::spawn(drain(Arc::clone(&self.shared), database.to_string()));
        } else {
            debug!(database = %database, "write queue busy, request queued");
        }
    }

    /// Number of operations waiting for `database`, excluding one in flight.
    pub fn pending(&self, database: &str) -> usize {
        self.shared
            .lock()
            .queues
            .get(database)
            .map_or(0, VecDeque::len)
    }

    /// Whether a drain task currently owns `database`.
    pub fn drain_state(&self, database: &str) -> DrainState {
        if self.shared.lock().active.contains(database) {
            DrainState::Draining
        } else {
            DrainState::Idle
        }
    }

    /// Wait until every database is idle.
    ///
    /// Operations enqueued while waiting are waited for too.
    pub async fn flush(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.lock().active.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

/// The drain loop for one database name.
///
/// Runs until it pops from an empty queue. A failed operation is reported
/// to its own completion and the loop moves on.
async fn drain<B: StorageBackend>(shared: Arc<Shared<B>>, database: String) {
    while let Some(op) = shared.next_op(&database) {
        let (result, completion) = match op {
            QueuedOp::Save(request) => {
                let result = shared.run_save(&database, &request.payload).await;
                if let Err(e) = &result {
                    error!(
                        database = %database,
                        backend = shared.backend.name(),
                        kind = %e.kind,
                        error = %e,
                        "save failed"
                    );
                }
                (result, request.completion)
            }
            QueuedOp::Delete(request) => {
                let result = shared.run_delete(&database).await;
                if let Err(e) = &result {
                    error!(
                        database = %database,
                        backend = shared.backend.name(),
                        kind = %e.kind,
                        error = %e,
                        "queued delete failed"
                    );
                }
                (result, request.completion)
            }
        };

        // A panicking callback must not strand the rest of the queue.
        if catch_unwind(AssertUnwindSafe(|| completion(result))).is_err() {
            error!(database = %database, "completion callback panicked");
        }
    }
    debug!(database = %database, "write queue idle");
}

/// Open `entry`, truncate it, and write `payload`.
pub(crate) async fn save_entry<B: StorageBackend + ?Sized>(
    backend: &B,
    entry: &str,
    payload: &[u8],
) -> Result<(), StoreError> {
    let handle = backend.open_entry(entry).await?;
    backend.truncate_and_write(&handle, payload).await
}

/// Open `entry` and remove it.
pub(crate) async fn remove_entry<B: StorageBackend + ?Sized>(
    backend: &B,
    entry: &str,
) -> Result<(), StoreError> {
    let handle = backend.open_entry(entry).await?;
    backend.remove(handle).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use lodestore_core::ErrorKind;
    use lodestore_test_utils::{BackendOp, FailPoint, MockBackend};
    use tokio::sync::oneshot;

    fn recorder() -> (
        Arc<StdMutex<Vec<(usize, Result<(), ErrorKind>)>>>,
        impl Fn(usize) -> Completion,
    ) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |i: usize| -> Completion {
            let sink = Arc::clone(&sink);
            Box::new(move |r: Result<(), StoreError>| {
                sink.lock().unwrap().push((i, r.map_err(|e| e.kind)));
            })
        };
        (log, make)
    }

    #[tokio::test]
    async fn saves_reach_backend_in_enqueue_order() {
        let backend = Arc::new(MockBackend::new());
        let queue = WriteQueue::new(Arc::clone(&backend), "p");
        let (log, make) = recorder();

        for i in 0..5 {
            queue.enqueue("db", format!("v{i}").into_bytes(), make(i));
        }
        queue.flush().await;

        let writes = backend.writes_for("p__db").await;
        let expected: Vec<Vec<u8>> = (0..5).map(|i| format!("v{i}").into_bytes()).collect();
        assert_eq!(writes, expected);
        let order: Vec<usize> = log.lock().unwrap().iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert_eq!(backend.overlaps().await, 0);
    }

    #[tokio::test]
    async fn completion_is_not_called_inside_enqueue() {
        let backend = Arc::new(MockBackend::new());
        let queue = WriteQueue::new(backend, "p");
        let (log, make) = recorder();

        queue.enqueue("db", b"x".to_vec(), make(0));
        assert!(log.lock().unwrap().is_empty());

        queue.flush().await;
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_enqueue_joins_running_drain() {
        let backend = Arc::new(MockBackend::new());
        let queue = WriteQueue::new(Arc::clone(&backend), "p");
        let (_log, make) = recorder();

        backend.pause_writes();
        queue.enqueue("db", b"a".to_vec(), make(0));
        assert_eq!(queue.drain_state("db"), DrainState::Draining);
        queue.enqueue("db", b"b".to_vec(), make(1));
        queue.enqueue("db", b"c".to_vec(), make(2));

        // Let the drain task reach the held write.
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(queue.pending("db"), 2);
        assert_eq!(queue.drain_state("db"), DrainState::Draining);

        backend.resume_writes();
        queue.flush().await;
        assert_eq!(queue.pending("db"), 0);
        assert_eq!(queue.drain_state("db"), DrainState::Idle);
    }

    #[tokio::test]
    async fn queue_reactivates_after_idle() {
        let backend = Arc::new(MockBackend::new());
        let queue = WriteQueue::new(Arc::clone(&backend), "p");
        let (log, make) = recorder();

        queue.enqueue("db", b"first".to_vec(), make(0));
        queue.flush().await;
        assert_eq!(queue.drain_state("db"), DrainState::Idle);

        queue.enqueue("db", b"second".to_vec(), make(1));
        queue.flush().await;

        assert_eq!(log.lock().unwrap().len(), 2);
        assert_eq!(backend.contents("p__db").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn resolution_failure_fails_forward() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next(FailPoint::ResolveRoot, None).await;
        let queue = WriteQueue::new(Arc::clone(&backend), "p");
        let (log, make) = recorder();

        queue.enqueue("db", b"one".to_vec(), make(0));
        queue.enqueue("db", b"two".to_vec(), make(1));
        queue.flush().await;

        let results = log.lock().unwrap().clone();
        assert_eq!(
            results,
            vec![(0, Err(ErrorKind::Resolution)), (1, Ok(()))]
        );
        assert_eq!(backend.contents("p__db").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn nonzero_truncate_skips_write() {
        let backend = Arc::new(MockBackend::new());
        backend.seed("p__db", b"stale").await;
        backend.leave_bytes_after_next_truncate("p__db").await;
        let queue = WriteQueue::new(Arc::clone(&backend), "p");
        let (log, make) = recorder();

        queue.enqueue("db", b"fresh".to_vec(), make(0));
        queue.flush().await;

        assert_eq!(log.lock().unwrap()[0], (0, Err(ErrorKind::Write)));
        assert!(backend.writes_for("p__db").await.is_empty());
        assert!(
            !backend
                .ops()
                .await
                .iter()
                .any(|op| matches!(op, BackendOp::Write { .. }))
        );
    }

    #[tokio::test]
    async fn queued_delete_runs_after_earlier_saves() {
        let backend = Arc::new(MockBackend::new());
        let queue = WriteQueue::new(Arc::clone(&backend), "p");
        let (tx, rx) = oneshot::channel();

        queue.enqueue("db", b"doomed".to_vec(), Box::new(|_| {}));
        queue.enqueue_delete(
            "db",
            Box::new(move |r| {
                let _ = tx.send(r);
            }),
        );
        rx.await.unwrap().unwrap();

        let ops = backend.ops().await;
        let write_at = ops
            .iter()
            .position(|op| matches!(op, BackendOp::Write { .. }))
            .unwrap();
        let remove_at = ops
            .iter()
            .position(|op| matches!(op, BackendOp::Remove(_)))
            .unwrap();
        assert!(write_at < remove_at);
        assert!(backend.contents("p__db").await.is_none());
    }

    #[tokio::test]
    async fn panicking_completion_does_not_stall_queue() {
        let backend = Arc::new(MockBackend::new());
        let queue = WriteQueue::new(Arc::clone(&backend), "p");
        let (log, make) = recorder();

        queue.enqueue("db", b"a".to_vec(), Box::new(|_| panic!("caller bug")));
        queue.enqueue("db", b"b".to_vec(), make(1));
        queue.flush().await;

        assert_eq!(log.lock().unwrap().clone(), vec![(1, Ok(()))]);
        assert_eq!(queue.drain_state("db"), DrainState::Idle);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn failed_save_is_logged_with_kind() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next(FailPoint::Write, None).await;
        let queue = WriteQueue::new(Arc::clone(&backend), "p");

        queue.enqueue("db", b"x".to_vec(), Box::new(|_| {}));
        queue.flush().await;

        assert!(logs_contain("save failed"));
        assert!(logs_contain("kind=write"));
    }

    #[tokio::test]
    async fn flush_returns_immediately_when_idle() {
        let queue = WriteQueue::new(Arc::new(MockBackend::new()), "p");
        queue.flush().await;
        assert_eq!(queue.pending("anything"), 0);
    }
}
