//! `serve` subcommand (C10 startup sequence). Ported from `main.py`'s
//! module-level startup: open the store, recover stale events, build the
//! tool registry and provider registry, start the adapters, install signal
//! handlers, and run the supervisor loop until shutdown.

use std::sync::Arc;

use tokio::sync::watch;

use sa_domain::config::Config;
use sa_providers::ProviderRegistry;
use sa_store::Store;
use sa_tools::{ListDirectoryTool, ReadFileTool, ShellRunTool, ToolRegistry, WriteFileTool};

use crate::adapters::{http as http_adapter, timer as timer_adapter};
use crate::state::{detect_approval_channel, AppState, Supervisor, Waiters};

const DEFAULT_TIMER_INTERVAL_SECONDS: u64 = 60;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let store = Arc::new(Store::new(&config.paths.db)?);
    let tools = Arc::new(build_tool_registry(&config));
    let providers = Arc::new(ProviderRegistry::from_config(&config.llm));

    if providers.is_empty() {
        tracing::warn!("no LLM providers registered; invocations will fail until one is configured");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    install_signal_handlers(shutdown_tx.clone());

    let waiters = Arc::new(Waiters::default());
    let supervisor = Supervisor::new(
        config.clone(),
        store.clone(),
        tools,
        providers,
        detect_approval_channel(),
        waiters.clone(),
    );

    let supervisor_handle = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move { supervisor.run(shutdown_rx).await }
    });

    let timer_handle = timer_adapter::spawn(store.clone(), DEFAULT_TIMER_INTERVAL_SECONDS, shutdown_rx.clone());

    let app_state = AppState {
        config: config.clone(),
        store,
        waiters,
    };

    let http_result = if config.network.enabled {
        http_adapter::serve(app_state, &config.network, shutdown_rx).await
    } else {
        shutdown_rx_wait(shutdown_rx).await;
        Ok(())
    };

    let _ = supervisor_handle.await;
    timer_handle.abort();
    http_result
}

async fn shutdown_rx_wait(mut rx: watch::Receiver<bool>) {
    let _ = rx.changed().await;
}

pub(crate) fn build_tool_registry(config: &Config) -> ToolRegistry {
    let paths = Arc::new(config.paths.clone());
    let tools_config = Arc::new(config.tools.clone());

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadFileTool::new(paths.clone())));
    registry.register(Arc::new(WriteFileTool::new(paths.clone())));
    registry.register(Arc::new(ListDirectoryTool::new(paths)));
    registry.register(Arc::new(ShellRunTool::new(tools_config)));
    registry
}

/// `ctrl_c()` plus, on unix, `SIGTERM` — both flip the same shutdown watch
/// channel so every task (supervisor, timer, HTTP server) observes one
/// consistent signal regardless of which OS signal arrived.
fn install_signal_handlers(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                    let _ = shutdown_tx.send(true);
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        tracing::info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}
