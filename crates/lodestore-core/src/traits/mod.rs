// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for pluggable storage backends.
//!
//! Backends use `#[async_trait]` so the adapter can hold them behind `Arc`.

pub mod storage;

pub use storage::StorageBackend;
