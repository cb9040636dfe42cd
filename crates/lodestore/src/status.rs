// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lodestore status` command implementation.
//!
//! Resolves the storage root and prints the effective storage settings.

use lodestore_config::model::LodestoreConfig;
use lodestore_core::{DeletePolicy, HealthStatus, StorageBackend};
use lodestore_storage::{DatabaseAdapter, FsBackend};
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub backend: String,
    pub root: String,
    pub prefix: String,
    pub delete_policy: DeletePolicy,
    pub healthy: bool,
    pub detail: Option<String>,
}

/// Probe the backend and assemble a report.
pub async fn collect_status(
    adapter: &DatabaseAdapter<FsBackend>,
    config: &LodestoreConfig,
) -> StatusReport {
    let (healthy, detail) = match adapter.health_check().await {
        HealthStatus::Healthy => (true, None),
        HealthStatus::Unhealthy(reason) => (false, Some(reason)),
    };
    StatusReport {
        backend: adapter.backend().name().to_string(),
        root: adapter.backend().root().display().to_string(),
        prefix: config.storage.prefix.clone(),
        delete_policy: config.storage.delete_policy,
        healthy,
        detail,
    }
}

/// Render a report as human-readable lines.
pub fn format_status(report: &StatusReport) -> String {
    let state = if report.healthy { "ok" } else { "unreachable" };
    let mut out = format!(
        "backend:       {}\nroot:          {} ({state})\nprefix:        {}\ndelete policy: {}\n",
        report.backend, report.root, report.prefix, report.delete_policy
    );
    if let Some(detail) = &report.detail {
        out.push_str(&format!("detail:        {detail}\n"));
    }
    out
}

/// Run `lodestore status`. Returns whether the root was reachable.
pub async fn run_status(
    adapter: &DatabaseAdapter<FsBackend>,
    config: &LodestoreConfig,
    json: bool,
) -> bool {
    let report = collect_status(adapter, config).await;
    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("lodestore: failed to encode status: {e}"),
        }
    } else {
        print!("{}", format_status(&report));
    }
    report.healthy
}
