// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./lodestore.toml` > `~/.config/lodestore/lodestore.toml`
//! > `/etc/lodestore/lodestore.toml`, with environment variable overrides via
//! the `LODESTORE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::LodestoreConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/lodestore/lodestore.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "lodestore.toml";

/// The per-user config file, if the platform has a config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lodestore").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/lodestore/lodestore.toml`
/// 3. `~/.config/lodestore/lodestore.toml`
/// 4. `./lodestore.toml`
/// 5. `LODESTORE_*` environment variables
pub fn load_config() -> Result<LodestoreConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the compiled defaults.
///
/// No files and no environment are consulted.
pub fn load_config_from_str(toml_content: &str) -> Result<LodestoreConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LodestoreConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LodestoreConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LodestoreConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment without extracting it.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(LodestoreConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Map `LODESTORE_<SECTION>_<KEY>` onto `section.key`.
///
/// Only the first underscore after the section name becomes a dot, so
/// `LODESTORE_STORAGE_ROOT_DIR` lands on `storage.root_dir`.
fn env_provider() -> Env {
    Env::prefixed("LODESTORE_").map(|key| {
        let key_str = key.as_str();
        for section in ["storage", "log"] {
            if let Some(rest) = key_str
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}
