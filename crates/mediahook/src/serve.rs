// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mediahook serve`: webhook server plus background download worker.

use std::sync::Arc;

use tracing::{error, info, warn};

use mediahook_core::{MediaHookError, Notifier, PluginAdapter};
use mediahook_gateway::GatewayState;
use mediahook_ingest::DownloadWorker;

use crate::app::App;
use crate::shutdown::install_signal_handler;

/// Installs the global subscriber. Logs go to stderr so stdout stays
/// reserved for command output.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mediahook={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs until SIGINT/SIGTERM.
///
/// Holds the worker lock for its lifetime. Startup fails any item a previous
/// process left in `downloading` and removes its partial files before the
/// worker starts.
pub async fn run_serve(app: App) -> Result<(), MediaHookError> {
    let _worker_lock = match app.store.try_worker_lock()? {
        Some(lock) => lock,
        None => {
            warn!(
                path = %app.store.worker_lock_path().display(),
                "another mediahook process owns downloads; waiting for it to finish"
            );
            app.store.worker_lock().await?
        }
    };
    app.recover().await?;

    let telegram = app.telegram()?;
    match telegram.health_check().await {
        Ok(status) => info!(?status, "telegram adapter ready"),
        Err(e) => warn!(error = %e, "telegram health check failed"),
    }

    let dispatcher = app.dispatcher(Arc::clone(&telegram));
    let mut worker = DownloadWorker::new(
        dispatcher.downloader().clone(),
        dispatcher.wake_handle(),
        app.config.worker.idle_poll(),
        app.config.workspace.root.clone(),
    );
    if app.config.server.notify_on_complete {
        worker = worker.with_notifier(telegram as Arc<dyn Notifier>);
    }

    let state = GatewayState::new(
        dispatcher,
        app.control.clone(),
        app.config.workspace.root.clone(),
    )
    .with_webhook_secret(app.config.telegram.webhook_secret.clone());

    let cancel = install_signal_handler();
    let worker_handle = tokio::spawn(worker.run(cancel.clone()));

    let served =
        mediahook_gateway::start_server(&app.config.server, state, cancel.clone()).await;

    // The server may have failed on its own; stop the worker either way.
    cancel.cancel();
    if let Err(e) = worker_handle.await {
        error!(error = %e, "download worker task panicked");
    }

    served?;
    info!("mediahook stopped");
    Ok(())
}
