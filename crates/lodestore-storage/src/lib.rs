// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence adapter for named databases over an asynchronous backend.
//!
//! Provides a per-database write queue that keeps at most one write in
//! flight per name and preserves submission order, the
//! [`DatabaseAdapter`] facade on top of it, and a filesystem backend.

pub mod adapter;
pub mod fs;
pub mod writer;

pub use adapter::{AdapterOptions, DatabaseAdapter, PendingWrite};
pub use fs::FsBackend;
pub use writer::{Completion, WriteQueue};
