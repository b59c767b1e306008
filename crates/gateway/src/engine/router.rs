//! Router (C4): a pure function of `event -> {agent_type, model_key, task_description}`.
//!
//! Ported from `core/router.py`'s `_ROUTING_RULES` / `route_event`, minus the
//! `(source=timer, type=tick)` rule the original carries — timer ticks are
//! consistently unroutable here (see DESIGN.md's Open Question decision #1),
//! so the supervisor marks every tick event `failed` rather than invoking an
//! agent for it. `source=user` is kept alongside `source=http` even though
//! only the HTTP adapter is wired up in this slice, matching the original's
//! rule list shape for a CLI/REPL producer that may push `source=user` events.

use sa_domain::config::ProjectsConfig;
use sa_store::Event;

use crate::engine::error::EngineError;

/// The result of routing one event: what agent should run, which model
/// category to use, and the literal task text to hand it.
#[derive(Debug, Clone)]
pub struct RoutedEvent {
    pub agent_type: String,
    pub model_key: String,
    pub task_description: String,
}

struct Rule {
    source: &'static str,
    event_type: &'static str,
    agent_type: &'static str,
    model_key: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        source: "user",
        event_type: "message",
        agent_type: "task_agent",
        model_key: "default",
    },
    Rule {
        source: "http",
        event_type: "message",
        agent_type: "task_agent",
        model_key: "default",
    },
];

/// Route `event` to an agent invocation, or fail with `EngineError::UnroutableEvent`.
///
/// `task_description` comes straight from `payload.message` — the original's
/// manual-regex `{payload[message]}` template collapses to a literal field
/// read for both rules here, since neither rule needs any other placeholder.
pub fn route_event(event: &Event) -> Result<RoutedEvent, EngineError> {
    for rule in RULES {
        if rule.source == event.source && rule.event_type == event.event_type {
            let task_description = event
                .payload
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            return Ok(RoutedEvent {
                agent_type: rule.agent_type.to_string(),
                model_key: rule.model_key.to_string(),
                task_description,
            });
        }
    }
    Err(EngineError::UnroutableEvent {
        source: event.source.clone(),
        event_type: event.event_type.clone(),
    })
}

/// Resolve the project an event is bound to: the event's own `project_id`
/// column takes priority, then the configured default, else unbound.
pub fn resolve_project_id(event: &Event, projects: &ProjectsConfig) -> Option<String> {
    event
        .project_id
        .clone()
        .or_else(|| projects.default_project_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(source: &str, event_type: &str, payload: serde_json::Value) -> Event {
        Event {
            id: "evt_test".into(),
            source: source.into(),
            event_type: event_type.into(),
            project_id: None,
            priority: 5,
            payload,
            status: "processing".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            processed_at: None,
        }
    }

    #[test]
    fn routes_user_message() {
        let e = event("user", "message", serde_json::json!({"message": "hi"}));
        let routed = route_event(&e).unwrap();
        assert_eq!(routed.agent_type, "task_agent");
        assert_eq!(routed.model_key, "default");
        assert_eq!(routed.task_description, "hi");
    }

    #[test]
    fn routes_http_message() {
        let e = event("http", "message", serde_json::json!({"message": "hello"}));
        let routed = route_event(&e).unwrap();
        assert_eq!(routed.task_description, "hello");
    }

    #[test]
    fn timer_tick_is_unroutable() {
        let e = event("timer", "tick", serde_json::json!({"minute": "2026-01-01T00:00"}));
        let err = route_event(&e).unwrap_err();
        assert!(matches!(err, EngineError::UnroutableEvent { .. }));
    }

    #[test]
    fn unknown_source_is_unroutable() {
        let e = event("cron", "message", serde_json::json!({"message": "hi"}));
        assert!(route_event(&e).is_err());
    }

    #[test]
    fn missing_message_field_yields_empty_task() {
        let e = event("user", "message", serde_json::json!({}));
        let routed = route_event(&e).unwrap();
        assert_eq!(routed.task_description, "");
    }

    #[test]
    fn resolve_project_id_prefers_event_payload() {
        let mut e = event("http", "message", serde_json::json!({"message": "hi"}));
        e.project_id = Some("proj-a".into());
        let cfg = ProjectsConfig {
            default_project_id: Some("proj-default".into()),
            ..Default::default()
        };
        assert_eq!(resolve_project_id(&e, &cfg).as_deref(), Some("proj-a"));
    }

    #[test]
    fn resolve_project_id_falls_back_to_config_default() {
        let e = event("http", "message", serde_json::json!({"message": "hi"}));
        let cfg = ProjectsConfig {
            default_project_id: Some("proj-default".into()),
            ..Default::default()
        };
        assert_eq!(resolve_project_id(&e, &cfg).as_deref(), Some("proj-default"));
    }

    #[test]
    fn resolve_project_id_unbound_when_neither_set() {
        let e = event("http", "message", serde_json::json!({"message": "hi"}));
        let cfg = ProjectsConfig::default();
        assert_eq!(resolve_project_id(&e, &cfg), None);
    }
}
