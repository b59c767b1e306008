//! HTTP network adapter (C3/C9). Ported from `adapters/network.py`: the
//! producer side pushes a `{source: http, type: message}` event and
//! synchronously awaits the completion handle keyed by that event's id;
//! the wire framing itself (routes, request/response shapes) lives in
//! [`crate::api::openai_compat`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use sa_domain::config::NetworkConfig;

use crate::state::{AppState, WaiterResult};

/// Push one chat message as an event and block until the supervisor
/// resolves it or `timeout` elapses. On timeout the waiter is unregistered
/// but the event itself is left in the queue — the invocation, once it
/// eventually runs, simply has no one left listening for its result.
pub async fn push_and_wait(
    state: &AppState,
    message: &str,
    project_id: Option<&str>,
    timeout: Duration,
) -> Result<WaiterResult, HttpAdapterError> {
    let event_id = state
        .push_http_message(message, project_id)
        .map_err(|e| HttpAdapterError::Push(e.to_string()))?;
    let rx = state.waiters.register(event_id.clone()).await;

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(_)) => Err(HttpAdapterError::WaiterDropped),
        Err(_) => {
            state.waiters.unregister(&event_id).await;
            Err(HttpAdapterError::Timeout)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HttpAdapterError {
    #[error("failed to enqueue event: {0}")]
    Push(String),
    #[error("the invocation never resolved a result")]
    WaiterDropped,
    #[error("timed out waiting for the invocation to complete")]
    Timeout,
}

/// Bind and serve the HTTP front-end until `shutdown` flips to `true`.
pub async fn serve(
    state: AppState,
    network: &NetworkConfig,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = crate::api::router(state);
    let addr = format!("{}:{}", network.tcp.host, network.tcp.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "HTTP front-end listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_domain::config::Config;
    use sa_store::Store;
    use std::sync::Arc as StdArc;

    fn state() -> AppState {
        AppState {
            config: StdArc::new(Config::default()),
            store: StdArc::new(Store::open_in_memory().unwrap()),
            waiters: StdArc::new(crate::state::Waiters::default()),
        }
    }

    #[tokio::test]
    async fn push_and_wait_times_out_when_nobody_resolves_it() {
        let state = state();
        let result = push_and_wait(&state, "hi", None, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(HttpAdapterError::Timeout)));
    }

    #[tokio::test]
    async fn push_and_wait_returns_the_resolved_outcome() {
        let state = state();
        let resolver_state = state.clone();
        tokio::spawn(async move {
            loop {
                if let Ok(Some(event)) = sa_store::EventQueue::new(&resolver_state.store).dequeue() {
                    resolver_state
                        .waiters
                        .resolve(
                            &event.id,
                            Ok(crate::engine::InvocationOutcome {
                                invocation_id: "inv_1".into(),
                                status: "done".into(),
                                response: "hello".into(),
                                tool_calls: Vec::new(),
                                steps: Vec::new(),
                            }),
                        )
                        .await;
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        let result = push_and_wait(&state, "hi", None, Duration::from_secs(2)).await;
        assert!(result.is_ok());
    }
}
