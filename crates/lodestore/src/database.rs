// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lodestore save`, `load`, and `delete` command implementations.

use std::io::{Read, Write};
use std::path::Path;

use lodestore_core::{StorageBackend, StoreError};
use lodestore_storage::DatabaseAdapter;
use tracing::info;

/// Read the payload for `save` from a file, or from stdin when `source` is `None`.
pub fn read_payload(source: Option<&Path>) -> Result<Vec<u8>, StoreError> {
    match source {
        Some(path) => std::fs::read(path).map_err(|e| {
            StoreError::read(format!("unable to read payload from {}", path.display()))
                .with_source(e)
        }),
        None => {
            let mut payload = Vec::new();
            std::io::stdin()
                .read_to_end(&mut payload)
                .map_err(|e| StoreError::read("unable to read payload from stdin").with_source(e))?;
            Ok(payload)
        }
    }
}

/// Run `lodestore save`.
pub async fn run_save<B: StorageBackend>(
    adapter: &DatabaseAdapter<B>,
    database: &str,
    payload: Vec<u8>,
) -> Result<(), StoreError> {
    let bytes = payload.len();
    adapter.save_database(database, payload).await?;
    info!(database = %database, bytes, "database saved");
    Ok(())
}

/// Run `lodestore load`, writing the contents to `out`.
///
/// Returns `false` when the database has no data.
pub async fn run_load<B: StorageBackend, W: Write>(
    adapter: &DatabaseAdapter<B>,
    database: &str,
    out: &mut W,
) -> Result<bool, StoreError> {
    match adapter.load_database(database).await? {
        Some(contents) => {
            out.write_all(&contents)
                .and_then(|()| out.flush())
                .map_err(|e| StoreError::read("unable to write contents to stdout").with_source(e))?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Run `lodestore delete`.
pub async fn run_delete<B: StorageBackend>(
    adapter: &DatabaseAdapter<B>,
    database: &str,
) -> Result<(), StoreError> {
    adapter.delete_database(database).await?;
    info!(database = %database, "database deleted");
    Ok(())
}
