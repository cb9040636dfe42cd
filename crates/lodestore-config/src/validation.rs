// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use lodestore_core::ENTRY_SEPARATOR;

use crate::diagnostic::ConfigError;
use crate::model::LodestoreConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &LodestoreConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let prefix = &config.storage.prefix;

    if prefix.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.prefix must not be empty".to_string(),
        });
    }

    // The prefix becomes part of a file name.
    if prefix.contains(['/', '\\', '\0']) {
        errors.push(ConfigError::Validation {
            message: format!("storage.prefix `{prefix}` must not contain path separators"),
        });
    }

    if prefix.contains(ENTRY_SEPARATOR) {
        errors.push(ConfigError::Validation {
            message: format!(
                "storage.prefix `{prefix}` must not contain the entry separator `{ENTRY_SEPARATOR}`"
            ),
        });
    }

    if let Some(root) = &config.storage.root_dir {
        if root.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "storage.root_dir must not be empty when set".to_string(),
            });
        }
    }

    let level = config.log.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` is not one of {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&LodestoreConfig::default()).is_ok());
    }

    #[test]
    fn empty_prefix_fails_validation() {
        let mut config = LodestoreConfig::default();
        config.storage.prefix = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn prefix_with_separator_fails_validation() {
        let mut config = LodestoreConfig::default();
        config.storage.prefix = "app__v2".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("entry separator"));
    }

    #[test]
    fn prefix_with_slash_fails_validation() {
        let mut config = LodestoreConfig::default();
        config.storage.prefix = "../escape".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = LodestoreConfig::default();
        config.storage.prefix = String::new();
        config.storage.root_dir = Some(String::new());
        config.log.level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = LodestoreConfig::default();
        config.log.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
