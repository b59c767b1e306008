//! `run <task>` subcommand: drive a single task through the engine and
//! print its final response, without starting the HTTP front-end. Useful
//! for smoke-testing a configuration the way `main.py --once` did.

use std::sync::Arc;

use sa_domain::config::Config;
use sa_providers::ProviderRegistry;
use sa_store::{EventQueue, Store};

use crate::cli::serve::build_tool_registry;
use crate::state::{detect_approval_channel, Supervisor, Waiters};

pub async fn run(config: Config, task: String) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let store = Arc::new(Store::new(&config.paths.db)?);
    let tools = Arc::new(build_tool_registry(&config));
    let providers = Arc::new(ProviderRegistry::from_config(&config.llm));

    if providers.is_empty() {
        anyhow::bail!("no LLM providers registered; check config.llm.providers");
    }

    let project_id = config.projects.default_project_id.clone();
    let payload = serde_json::json!({"message": task});
    let event_id = EventQueue::new(&store).push("user", "message", payload, project_id, 3)?;

    let waiters = Arc::new(Waiters::default());
    let rx = waiters.register(event_id.clone()).await;

    let supervisor = Supervisor::new(
        config.clone(),
        store.clone(),
        tools,
        providers,
        detect_approval_channel(),
        waiters,
    );

    let event = EventQueue::new(&store)
        .dequeue()?
        .ok_or_else(|| anyhow::anyhow!("just-pushed event '{event_id}' vanished from the queue"))?;
    supervisor.process_event(&event).await;

    match rx.await {
        Ok(Ok(outcome)) => {
            println!("{}", outcome.response);
            if outcome.status != "done" {
                std::process::exit(1);
            }
            Ok(())
        }
        Ok(Err(message)) => {
            eprintln!("invocation failed: {message}");
            std::process::exit(1);
        }
        Err(_) => {
            anyhow::bail!("invocation never resolved a result")
        }
    }
}
