// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Lodestore persistence adapter.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use lodestore_core::DeletePolicy;
use serde::{Deserialize, Serialize};

/// Top-level Lodestore configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LodestoreConfig {
    /// Storage backend and write queue settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Storage backend and write queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Namespace for entry names: a database `notes` is stored as
    /// `<prefix>__notes`.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Directory holding the entries. `None` uses the platform data
    /// directory (`$XDG_DATA_HOME/lodestore` on Linux).
    #[serde(default)]
    pub root_dir: Option<String>,

    /// Whether deletes are queued behind pending saves for the same name.
    #[serde(default)]
    pub delete_policy: DeletePolicy,

    /// Call `fsync` after every payload write.
    #[serde(default = "default_sync_on_write")]
    pub sync_on_write: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            root_dir: None,
            delete_policy: DeletePolicy::default(),
            sync_on_write: default_sync_on_write(),
        }
    }
}

fn default_prefix() -> String {
    "lodestore".to_string()
}

fn default_sync_on_write() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
