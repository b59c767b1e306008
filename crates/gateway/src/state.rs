//! Shared application state (C9's `AppState`) and the supervisor loop
//! (C10). Ported from `main.py`'s `_event_loop`/`_resolve_pending` plus
//! `main_loop.py`'s `_select_model`/`_make_approval_gate` helpers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch, Mutex as AsyncMutex};

use sa_domain::config::Config;
use sa_providers::{LlmProvider, ProviderRegistry};
use sa_store::{ids, ContextManager, EventQueue, Store};
use sa_tools::ToolRegistry;

use crate::engine::{
    resolve_project_id, route_event, ApprovalChannel, ApprovalGate, InvocationOutcome,
    InvocationParams, Invoker,
};

const IDLE_SLEEP: Duration = Duration::from_millis(500);

/// What a waiting HTTP request eventually receives: the finished invocation,
/// or the text of whatever terminated the event before one could run.
pub type WaiterResult = Result<InvocationOutcome, String>;

/// Keyed completion handles for in-flight events a front-end is blocking on.
/// A missing entry on `resolve` is not an error — the waiter may have
/// already timed out and unregistered while the event kept running.
#[derive(Default)]
pub struct Waiters {
    inner: AsyncMutex<HashMap<String, oneshot::Sender<WaiterResult>>>,
}

impl Waiters {
    pub async fn register(&self, event_id: String) -> oneshot::Receiver<WaiterResult> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().await.insert(event_id, tx);
        rx
    }

    pub async fn resolve(&self, event_id: &str, result: WaiterResult) {
        if let Some(tx) = self.inner.lock().await.remove(event_id) {
            let _ = tx.send(result);
        }
    }

    pub async fn unregister(&self, event_id: &str) {
        self.inner.lock().await.remove(event_id);
    }
}

/// Shared handle given to every axum route. Cheap to clone — everything
/// behind it is already an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub waiters: Arc<Waiters>,
}

impl AppState {
    /// Push one HTTP chat-completion request onto the queue as a
    /// `{source: "http", type: "message"}` event. `_ts` breaks the queue's
    /// hour-bucket dedup so two distinct requests with identical text in the
    /// same hour are never silently merged into one.
    pub fn push_http_message(
        &self,
        message: &str,
        project_id: Option<&str>,
    ) -> sa_domain::error::Result<String> {
        let payload = serde_json::json!({
            "message": message,
            "agent_type": self.config.network.default_agent_type,
            "_ts": ids::new_id(),
        });
        EventQueue::new(&self.store).push("http", "message", payload, project_id, 3)
    }
}

/// Resolve the LLM provider to use for a given invocation. There is exactly
/// one supported provider kind, so selection is "the sole registered
/// provider" rather than a smart router — `ProviderRegistry::list_providers`
/// is consulted only to pick a deterministic first id if several are
/// configured (config.toml authors are expected to configure one).
pub fn resolve_provider(providers: &ProviderRegistry) -> Option<Arc<dyn LlmProvider>> {
    let ids = providers.list_providers();
    let id = ids.first()?;
    providers.get(id)
}

/// The supervisor: owns the dequeue loop, routing, project binding, model
/// selection, and invocation dispatch for every event regardless of which
/// adapter produced it.
pub struct Supervisor {
    config: Arc<Config>,
    store: Arc<Store>,
    tools: Arc<ToolRegistry>,
    providers: Arc<ProviderRegistry>,
    approval: Option<Arc<ApprovalGate>>,
    waiters: Arc<Waiters>,
}

impl Supervisor {
    pub fn new(
        config: Arc<Config>,
        store: Arc<Store>,
        tools: Arc<ToolRegistry>,
        providers: Arc<ProviderRegistry>,
        approval_channel: ApprovalChannel,
        waiters: Arc<Waiters>,
    ) -> Self {
        let approval = Some(Arc::new(ApprovalGate::new(store.clone(), approval_channel)));
        Self {
            config,
            store,
            tools,
            providers,
            approval,
            waiters,
        }
    }

    /// Run until `shutdown` flips to `true`. Exits only between events —
    /// never mid-invocation — so a shutdown request is always observed at a
    /// clean boundary.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        EventQueue::new(&self.store)
            .reset_stale()
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to reset stale events at startup");
                0
            });

        loop {
            if *shutdown.borrow() {
                tracing::info!("supervisor shutting down");
                return;
            }

            let dequeued = EventQueue::new(&self.store).dequeue();
            let event = match dequeued {
                Ok(Some(event)) => event,
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(IDLE_SLEEP) => {}
                        _ = shutdown.changed() => {}
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to dequeue event, backing off");
                    tokio::time::sleep(IDLE_SLEEP).await;
                    continue;
                }
            };

            self.process_event(&event).await;
        }
    }

    /// Route, bind, and invoke a single dequeued event. `pub(crate)` so the
    /// one-shot `run` CLI subcommand can drive a single event through the
    /// same path as the main loop without spinning up the full supervisor.
    pub(crate) async fn process_event(&self, event: &sa_store::Event) {
        let queue = EventQueue::new(&self.store);

        let routed = match route_event(event) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(event_id = %event.id, error = %e, "event is unroutable");
                let _ = queue.fail(&event.id);
                self.waiters.resolve(&event.id, Err(e.to_string())).await;
                return;
            }
        };

        let project_id = resolve_project_id(event, &self.config.projects);
        if let Some(pid) = &project_id {
            let ctx = ContextManager::new(&self.store);
            if let Err(e) = ctx.ensure_project(pid, &self.config.projects.default_project_name) {
                tracing::error!(event_id = %event.id, error = %e, "failed to ensure project row");
            }
        }

        let agent_config = self
            .config
            .agents
            .get(&routed.agent_type)
            .cloned()
            .unwrap_or_default();

        let Some(model_entry) = self.config.models.resolve(&routed.model_key) else {
            let message = format!("model key {} does not resolve", routed.model_key);
            tracing::error!(event_id = %event.id, %message);
            let _ = queue.fail(&event.id);
            self.waiters.resolve(&event.id, Err(message)).await;
            return;
        };

        let Some(provider) = resolve_provider(&self.providers) else {
            let message = "no LLM provider registered".to_string();
            tracing::error!(event_id = %event.id, %message);
            let _ = queue.fail(&event.id);
            self.waiters.resolve(&event.id, Err(message)).await;
            return;
        };

        let invoker = Invoker::new(
            self.store.clone(),
            self.tools.clone(),
            provider,
            self.approval.clone(),
            self.config.context.recent_buffer_tokens,
        );

        let params = InvocationParams {
            event_id: Some(&event.id),
            agent_type: &routed.agent_type,
            agent_config: &agent_config,
            model_name: &model_entry.name,
            model_id: &model_entry.model,
            max_tokens: model_entry.max_tokens,
            project_id: project_id.as_deref(),
            task_description: &routed.task_description,
        };

        match invoker.run(params).await {
            Ok(outcome) => {
                let _ = queue.complete(&event.id);
                self.waiters.resolve(&event.id, Ok(outcome)).await;
            }
            Err(e) => {
                tracing::error!(event_id = %event.id, error = %e, "invocation terminated with an error");
                let _ = queue.fail(&event.id);
                self.waiters.resolve(&event.id, Err(e.to_string())).await;
            }
        }
    }
}

/// Decide the approval channel the way the original checks
/// `sys.stdin.isatty()`: a real terminal gets interactive prompts, anything
/// else (piped stdin, a service unit, a container) is always non-interactive.
pub fn detect_approval_channel() -> ApprovalChannel {
    use std::io::IsTerminal;
    if std::io::stdin().is_terminal() {
        ApprovalChannel::Terminal
    } else {
        ApprovalChannel::NonInteractive
    }
}

