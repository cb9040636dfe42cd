// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Lodestore persistence adapter.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Boxed backend error carried as the source of a [`StoreError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classifies which step of a storage operation failed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The storage root could not be reached.
    Resolution,
    /// The named entry could not be obtained or created.
    Access,
    /// Truncate or write failed, including a nonzero length after truncate.
    Write,
    /// The entry contents could not be read.
    Read,
    /// The entry could not be removed.
    Delete,
    /// The database name was rejected before reaching the backend.
    InvalidName,
    /// The request was dropped before the drain task could answer it.
    Aborted,
}

/// The error type returned by every adapter and backend operation.
///
/// A single tagged struct rather than one type per failure: `kind` says which
/// step failed, `message` is the human-readable summary, and `source` keeps
/// the backend detail when one exists.
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct StoreError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl StoreError {
    /// Create an error without an underlying cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the backend error that caused this one.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, message)
    }

    pub fn access(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Access, message)
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Write, message)
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Read, message)
    }

    pub fn delete(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Delete, message)
    }

    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidName, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Aborted, message)
    }
}
