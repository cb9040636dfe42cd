// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Lodestore integration tests.
//!
//! Provides an instrumented in-memory backend for fast, deterministic,
//! CI-runnable tests of the write queue without touching the filesystem.
//!
//! # Components
//!
//! - [`MockBackend`] - In-memory backend with an operation log, latency,
//!   failure injection, and overlap detection

pub mod mock_backend;

pub use mock_backend::{BackendOp, FailPoint, MockBackend};
