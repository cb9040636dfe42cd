// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the backend contract, the write queue, and config.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::StoreError;

/// Separator between the configured prefix and the database name.
pub const ENTRY_SEPARATOR: &str = "__";

/// Health status reported by [`crate::StorageBackend`] probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// The storage root resolved.
    Healthy,
    /// The storage root could not be resolved.
    Unhealthy(String),
}

/// Per-database state of the write queue.
///
/// `Idle -> Draining -> Idle`, with no terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum DrainState {
    Idle,
    Draining,
}

/// How `delete_database` is ordered against queued saves for the same name.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Deletes join the per-name FIFO and run single-flight with saves.
    #[default]
    Ordered,
    /// Deletes go straight to the backend and may race queued saves.
    Immediate,
}

/// Name of the backend entry that stores `database`.
pub fn entry_name(prefix: &str, database: &str) -> String {
    format!("{prefix}{ENTRY_SEPARATOR}{database}")
}

/// Reject database names the adapter will never hand to a backend.
pub fn validate_database_name(database: &str) -> Result<(), StoreError> {
    if database.is_empty() {
        return Err(StoreError::invalid_name("database name must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn entry_name_joins_prefix_and_database() {
        assert_eq!(entry_name("loki", "mydb"), "loki__mydb");
    }

    #[test]
    fn empty_database_name_is_rejected() {
        let err = validate_database_name("").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidName);
        assert!(validate_database_name("notes").is_ok());
    }

    #[test]
    fn delete_policy_defaults_to_ordered() {
        assert_eq!(DeletePolicy::default(), DeletePolicy::Ordered);
        assert_eq!("immediate".parse::<DeletePolicy>().unwrap(), DeletePolicy::Immediate);
    }

    #[test]
    fn drain_state_display() {
        assert_eq!(DrainState::Idle.to_string(), "idle");
        assert_eq!(DrainState::Draining.to_string(), "draining");
    }
}
