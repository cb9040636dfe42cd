// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Lodestore persistence adapter.
//!
//! This crate provides the storage backend contract, the error type, and the
//! small shared types used by the write queue, the facade, and configuration.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BoxError, ErrorKind, StoreError};
pub use traits::StorageBackend;
pub use types::{
    entry_name, validate_database_name, DeletePolicy, DrainState, HealthStatus, ENTRY_SEPARATOR,
};
