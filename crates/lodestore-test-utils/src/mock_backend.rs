// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock storage backend for deterministic testing.
//!
//! `MockBackend` implements `StorageBackend` over an in-memory map and
//! records every primitive call so tests can assert the order in which the
//! write queue reached the backend.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use lodestore_core::{StorageBackend, StoreError};

/// One primitive call observed by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOp {
    ResolveRoot,
    GetOrCreate(String),
    Truncate(String),
    Write { entry: String, payload: Vec<u8> },
    Read(String),
    Remove(String),
}

/// Which primitive an injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    ResolveRoot,
    GetOrCreate,
    Truncate,
    Write,
    Read,
    Remove,
}

#[derive(Default)]
struct MockState {
    entries: HashMap<String, Vec<u8>>,
    ops: Vec<BackendOp>,
    /// Pending one-shot failures. `None` matches any entry.
    failures: Vec<(FailPoint, Option<String>)>,
    /// Entries whose next truncate reports a nonzero length.
    dirty_truncates: Vec<String>,
    /// Entries between truncate start and write end.
    writing: HashSet<String>,
    overlaps: usize,
    latency: HashMap<String, Duration>,
}

impl MockState {
    fn take_failure(&mut self, point: FailPoint, entry: Option<&str>) -> bool {
        let position = self.failures.iter().position(|(p, target)| {
            *p == point
                && match target {
                    None => true,
                    Some(t) => Some(t.as_str()) == entry,
                }
        });
        match position {
            Some(i) => {
                self.failures.remove(i);
                true
            }
            None => false,
        }
    }
}

/// An in-memory storage backend for tests.
///
/// - Every call is appended to an operation log readable via [`ops()`](Self::ops).
/// - Failures are injected one at a time with [`fail_next()`](Self::fail_next).
/// - A truncate-then-write window that opens while another is open for the
///   same entry is counted in [`overlaps()`](Self::overlaps).
/// - Writes can be held with [`pause_writes()`](Self::pause_writes) to
///   observe the queue while a write is in flight.
pub struct MockBackend {
    state: Mutex<MockState>,
    default_latency: Duration,
    gate: watch::Sender<bool>,
}

impl MockBackend {
    /// Create a mock with no latency and no stored entries.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            state: Mutex::new(MockState::default()),
            default_latency: Duration::ZERO,
            gate,
        }
    }

    /// Sleep for `latency` inside every primitive call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    /// Override the latency for a single entry.
    pub async fn set_entry_latency(&self, entry: &str, latency: Duration) {
        self.state
            .lock()
            .await
            .latency
            .insert(entry.to_string(), latency);
    }

    /// Fail the next call to `point`, optionally only for `entry`.
    pub async fn fail_next(&self, point: FailPoint, entry: Option<&str>) {
        self.state
            .lock()
            .await
            .failures
            .push((point, entry.map(str::to_string)));
    }

    /// Make the next truncate on `entry` report a nonzero length.
    pub async fn leave_bytes_after_next_truncate(&self, entry: &str) {
        self.state
            .lock()
            .await
            .dirty_truncates
            .push(entry.to_string());
    }

    /// Store `contents` under `entry` without logging an operation.
    pub async fn seed(&self, entry: &str, contents: &[u8]) {
        self.state
            .lock()
            .await
            .entries
            .insert(entry.to_string(), contents.to_vec());
    }

    /// Hold every write until [`resume_writes()`](Self::resume_writes).
    pub fn pause_writes(&self) {
        self.gate.send_replace(true);
    }

    /// Release held writes.
    pub fn resume_writes(&self) {
        self.gate.send_replace(false);
    }

    /// All operations observed so far.
    pub async fn ops(&self) -> Vec<BackendOp> {
        self.state.lock().await.ops.clone()
    }

    /// Payloads written to `entry`, in the order the writes arrived.
    pub async fn writes_for(&self, entry: &str) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .await
            .ops
            .iter()
            .filter_map(|op| match op {
                BackendOp::Write { entry: e, payload } if e == entry => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// Current contents of `entry`, if it exists.
    pub async fn contents(&self, entry: &str) -> Option<Vec<u8>> {
        self.state.lock().await.entries.get(entry).cloned()
    }

    /// Number of times a truncate began while the same entry was mid-write.
    pub async fn overlaps(&self) -> usize {
        self.state.lock().await.overlaps
    }

    async fn delay(&self, entry: Option<&str>) {
        let latency = {
            let state = self.state.lock().await;
            entry
                .and_then(|e| state.latency.get(e).copied())
                .unwrap_or(self.default_latency)
        };
        if latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    type Root = ();
    type Entry = String;

    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve_root(&self) -> Result<(), StoreError> {
        self.delay(None).await;
        let mut state = self.state.lock().await;
        state.ops.push(BackendOp::ResolveRoot);
        if state.take_failure(FailPoint::ResolveRoot, None) {
            return Err(StoreError::resolution("unable to resolve mock root"));
        }
        Ok(())
    }

    async fn get_or_create_entry(&self, _root: &(), name: &str) -> Result<String, StoreError> {
        self.delay(Some(name)).await;
        let mut state = self.state.lock().await;
        state.ops.push(BackendOp::GetOrCreate(name.to_string()));
        if state.take_failure(FailPoint::GetOrCreate, Some(name)) {
            return Err(StoreError::access(format!("unable to get entry {name}")));
        }
        state.entries.entry(name.to_string()).or_default();
        Ok(name.to_string())
    }

    async fn truncate(&self, entry: &String) -> Result<u64, StoreError> {
        {
            let mut state = self.state.lock().await;
            state.ops.push(BackendOp::Truncate(entry.clone()));
            if !state.writing.insert(entry.clone()) {
                state.overlaps += 1;
            }
        }
        self.delay(Some(entry)).await;

        let mut state = self.state.lock().await;
        if state.take_failure(FailPoint::Truncate, Some(entry)) {
            state.writing.remove(entry);
            return Err(StoreError::write(format!("unable to truncate {entry}")));
        }
        if let Some(i) = state.dirty_truncates.iter().position(|e| e == entry) {
            state.dirty_truncates.remove(i);
            state.writing.remove(entry);
            let leftover = state.entries.get(entry).map_or(0, Vec::len).max(1);
            return Ok(leftover as u64);
        }
        state.entries.insert(entry.clone(), Vec::new());
        Ok(0)
    }

    async fn write(&self, entry: &String, payload: &[u8]) -> Result<(), StoreError> {
        let mut gate = self.gate.subscribe();
        while *gate.borrow_and_update() {
            if gate.changed().await.is_err() {
                break;
            }
        }
        self.delay(Some(entry)).await;

        let mut state = self.state.lock().await;
        state.ops.push(BackendOp::Write {
            entry: entry.clone(),
            payload: payload.to_vec(),
        });
        state.writing.remove(entry);
        if state.take_failure(FailPoint::Write, Some(entry)) {
            return Err(StoreError::write(format!("unable to write {entry}")));
        }
        state.entries.insert(entry.clone(), payload.to_vec());
        tracing::trace!(entry = %entry, bytes = payload.len(), "mock write");
        Ok(())
    }

    async fn read_all(&self, entry: &String) -> Result<Vec<u8>, StoreError> {
        self.delay(Some(entry)).await;
        let mut state = self.state.lock().await;
        state.ops.push(BackendOp::Read(entry.clone()));
        if state.take_failure(FailPoint::Read, Some(entry)) {
            return Err(StoreError::read(format!("unable to read {entry}")));
        }
        Ok(state.entries.get(entry).cloned().unwrap_or_default())
    }

    async fn remove(&self, entry: String) -> Result<(), StoreError> {
        self.delay(Some(&entry)).await;
        let mut state = self.state.lock().await;
        state.ops.push(BackendOp::Remove(entry.clone()));
        if state.take_failure(FailPoint::Remove, Some(&entry)) {
            return Err(StoreError::delete(format!("unable to delete {entry}")));
        }
        state.entries.remove(&entry);
        Ok(())
    }
}
