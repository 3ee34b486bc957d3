// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue inspection and control subcommands.

use serde::Serialize;

use mediahook_core::{HealthStatus, MediaHookError, MediaItem, PluginAdapter};

use crate::app::App;
use crate::ingest::print_json;

/// `pending --json` entry.
#[derive(Debug, Serialize)]
struct PendingEntry<'a> {
    #[serde(flatten)]
    item: &'a MediaItem,
    path: Option<std::path::PathBuf>,
}

pub async fn run_status(app: &App, json: bool) -> Result<(), MediaHookError> {
    let snapshot = app.control.status().await?;
    if json {
        return print_json(&snapshot);
    }

    println!("queue: {}", app.store.path().display());
    for (status, count) in &snapshot.counts {
        println!("  {status:<12} {count}");
    }
    println!("  exhausted    {}", snapshot.exhausted);
    match snapshot.cursor {
        Some(cursor) => println!("poll cursor: {cursor}"),
        None => println!("poll cursor: none"),
    }
    if snapshot.corrupt_events > 0 {
        println!(
            "warning: {} corrupt queue document(s) quarantined this run",
            snapshot.corrupt_events
        );
    }
    Ok(())
}

pub async fn run_pending(app: &App, json: bool) -> Result<(), MediaHookError> {
    let items = app.control.list_pending_for_consumption().await?;
    let root = &app.config.workspace.root;

    if json {
        let entries: Vec<PendingEntry<'_>> = items
            .iter()
            .map(|item| PendingEntry {
                item,
                path: item.absolute_path(root),
            })
            .collect();
        return print_json(&entries);
    }

    if items.is_empty() {
        println!("no downloaded media awaiting consumption");
        return Ok(());
    }
    for item in &items {
        let path = item
            .absolute_path(root)
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match &item.caption {
            Some(caption) => println!("{}  {}  {}", item.id, path, caption),
            None => println!("{}  {}", item.id, path),
        }
    }
    Ok(())
}

pub async fn run_retry(app: &App, id: Option<&str>, all: bool) -> Result<(), MediaHookError> {
    if all {
        let ids = app.control.retry_failed().await?;
        println!("{} item(s) back in the queue", ids.len());
        for id in ids {
            println!("  {id}");
        }
        return Ok(());
    }

    let id = id.ok_or_else(|| MediaHookError::Config("retry needs an item id or --all".into()))?;
    let item = app.control.retry(id).await?;
    println!("{} is {} (attempts: {})", item.id, item.status, item.attempts);
    Ok(())
}

pub async fn run_consume(app: &App, id: &str) -> Result<(), MediaHookError> {
    let item = app.control.consume(id).await?;
    println!("{} is {}", item.id, item.status);
    Ok(())
}

/// Prints the resolved configuration paths and whether the queue loads.
pub async fn run_check(app: &App) -> Result<(), MediaHookError> {
    let ws = &app.config.workspace;
    println!("config ok");
    println!("  workspace   {}", ws.root.display());
    println!("  uploads     {}", ws.upload_path().display());
    println!("  queue file  {}", ws.queue_path().display());
    println!(
        "  bot token   {}",
        if app.config.telegram.require_bot_token().is_ok() {
            "set"
        } else {
            "missing (fetch, ingest, and serve will refuse to start)"
        }
    );
    println!(
        "  control api {}",
        if app.config.server.bearer_token.is_some() {
            "bearer token set"
        } else {
            "disabled (no server.bearer_token)"
        }
    );

    let doc = app.store.load().await?;
    match app.store.health_check().await? {
        HealthStatus::Healthy => println!("queue ok ({} item(s))", doc.len()),
        HealthStatus::Degraded(detail) | HealthStatus::Unhealthy(detail) => {
            println!("queue degraded: {detail}")
        }
    }
    Ok(())
}
