//! Agent invocation engine (C8) — the structured reasoning/tool-call loop.
//!
//! Ported from `core/agent_invoker.py`. Three nested loops, outside in:
//!
//! 1. **Iteration loop** (§4.8.4): up to `agent_config.max_iterations` model
//!    turns (§6.4 `agents.<type>.max_iterations`, default 100). Each turn
//!    either finishes the task (`tool_call: null`) or dispatches one tool
//!    call and folds the result back into the conversation.
//! 2. **Truncation loop** (§4.8.3): each model turn itself retries up to
//!    `max_continuations` times if the transport reports the response was
//!    cut off (`finish_reason == "length"`). Partial JSON is never merged —
//!    a continuation always restarts generation from the same prompt plus a
//!    synthetic "you were cut off" turn.
//! 3. **Validation-retry loop** (§4.8.2): each model turn's raw text must
//!    parse as `{reasoning, tool_call}`; a parse/shape failure is fed back to
//!    the model as a validation error, up to `max_validation_retries` times.
//!
//! Only the iteration cap is configurable, per agent type (`AgentConfig`).
//! The continuation and validation-retry caps mirror the original's
//! module-level constants exactly and are not exposed in `Config`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use sa_domain::config::AgentConfig;
use sa_domain::error::{Error as DomainError, Result as DomainResult};
use sa_domain::tool::Message;
use sa_providers::{ChatRequest, LlmProvider};
use sa_store::{ContextManager, Invocations, Store, Summarizer, ToolCalls};
use sa_tools::{RiskLevel, ToolRegistry};

use crate::engine::approval::ApprovalGate;
use crate::engine::error::EngineError;

pub const MAX_CONTINUATIONS: u32 = 5;
pub const MAX_VALIDATION_RETRIES: u32 = 3;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Structured response contract (§4.8.2)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawToolCall {
    tool: String,
    #[serde(default)]
    parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AgentResponse {
    reasoning: String,
    #[serde(default)]
    tool_call: Option<RawToolCall>,
}

/// Parse a model turn's raw text into the structured contract. `json_mode`
/// on the request is a hint, never a guarantee — every provider's text is
/// re-parsed and re-validated here regardless of what it claims.
fn extract_agent_response(content: &str) -> Result<AgentResponse, String> {
    serde_json::from_str::<AgentResponse>(content.trim())
        .map_err(|e| format!("response did not match {{reasoning, tool_call}}: {e}"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One step of the completed run: a model turn that dispatched a tool.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub reasoning: String,
    pub tool: String,
    pub parameters: Value,
}

/// The full result of one invocation, returned to whichever adapter is
/// waiting on it (HTTP response, `run` CLI subcommand, ...).
#[derive(Debug, Clone, Serialize)]
pub struct InvocationOutcome {
    pub invocation_id: String,
    pub status: String,
    pub response: String,
    pub tool_calls: Vec<Value>,
    pub steps: Vec<Step>,
}

/// Everything the engine needs to run one invocation, already resolved by
/// the supervisor (routing decision, model selection, provider lookup).
pub struct InvocationParams<'a> {
    pub event_id: Option<&'a str>,
    pub agent_type: &'a str,
    pub agent_config: &'a AgentConfig,
    pub model_name: &'a str,
    pub model_id: &'a str,
    pub max_tokens: Option<u32>,
    pub project_id: Option<&'a str>,
    pub task_description: &'a str,
}

pub struct Invoker {
    store: Arc<Store>,
    tools: Arc<ToolRegistry>,
    provider: Arc<dyn LlmProvider>,
    approval: Option<Arc<ApprovalGate>>,
    recent_buffer_tokens: usize,
}

impl Invoker {
    pub fn new(
        store: Arc<Store>,
        tools: Arc<ToolRegistry>,
        provider: Arc<dyn LlmProvider>,
        approval: Option<Arc<ApprovalGate>>,
        recent_buffer_tokens: usize,
    ) -> Self {
        Self {
            store,
            tools,
            provider,
            approval,
            recent_buffer_tokens,
        }
    }

    pub async fn run(&self, params: InvocationParams<'_>) -> DomainResult<InvocationOutcome> {
        let ctx = ContextManager::new(&self.store);
        let context_text = match params.project_id {
            Some(pid) => ctx.assemble_context(pid, self.recent_buffer_tokens)?,
            None => String::new(),
        };

        let invocations = Invocations::new(&self.store);
        let invocation_id = invocations.start(
            params.event_id,
            params.agent_type,
            params.model_name,
            params.project_id,
            if context_text.is_empty() { None } else { Some(context_text.as_str()) },
        )?;

        let mut history = self.assemble_initial_messages(&context_text, params.task_description);
        let mut steps: Vec<Step> = Vec::new();

        let outcome = self
            .iterate(&invocation_id, &mut history, &mut steps, &params)
            .await;

        let (status, response) = match outcome {
            Ok(final_response) => ("done", final_response),
            Err(e) => ("failed", e.to_string()),
        };

        if let Some(project_id) = params.project_id {
            ctx.append_to_history(project_id, "user", params.task_description)?;
            ctx.append_to_history(project_id, "agent", &response)?;
            let summarizer = ProviderSummarizer(self.provider.clone());
            ctx.maybe_summarise(project_id, self.recent_buffer_tokens, &summarizer)
                .await?;
        }

        let tool_call_rows = ToolCalls::new(&self.store).list_for_invocation(&invocation_id)?;
        let tool_calls_json: Vec<Value> = tool_call_rows
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id,
                    "tool_name": r.tool_name,
                    "parameters": r.parameters,
                    "risk_level": r.risk_level,
                    "result": r.result,
                    "status": r.status,
                })
            })
            .collect();
        let tool_calls_summary = serde_json::to_string(&tool_calls_json).ok();

        invocations.finish(
            &invocation_id,
            status,
            Some(response.as_str()),
            tool_calls_summary.as_deref(),
        )?;

        Ok(InvocationOutcome {
            invocation_id,
            status: status.to_string(),
            response,
            tool_calls: tool_calls_json,
            steps,
        })
    }

    fn assemble_initial_messages(&self, context_text: &str, task_description: &str) -> Vec<Message> {
        let descriptors = self.tools.schema_for_agent();
        let mut messages = vec![Message::system(build_system_prompt(&descriptors))];
        if !context_text.is_empty() {
            messages.push(Message::user(context_text.to_string()));
        }
        messages.push(Message::user(task_description.to_string()));
        messages
    }

    /// Drives the iteration loop. Returns the final response text on
    /// success, or the terminal `EngineError` that ended the invocation.
    async fn iterate(
        &self,
        invocation_id: &str,
        history: &mut Vec<Message>,
        steps: &mut Vec<Step>,
        params: &InvocationParams<'_>,
    ) -> Result<String, EngineError> {
        for _ in 0..params.agent_config.max_iterations {
            let agent_response = self.model_turn(history, params.max_tokens, params.model_id).await?;
            history.push(Message::assistant(
                serde_json::to_string(&agent_response).unwrap_or_default(),
            ));

            let Some(tool_call) = agent_response.tool_call else {
                return Ok(agent_response.reasoning);
            };

            let result = self
                .dispatch_tool(
                    invocation_id,
                    &tool_call.tool,
                    tool_call.parameters.clone(),
                    params.agent_type,
                    params.agent_config,
                    params.project_id,
                )
                .await;

            steps.push(Step {
                reasoning: agent_response.reasoning,
                tool: tool_call.tool.clone(),
                parameters: tool_call.parameters.clone(),
            });

            history.push(Message::user(format!(
                "<tool_result tool=\"{}\">{}</tool_result>",
                tool_call.tool, result
            )));
        }
        Err(EngineError::IterationCap)
    }

    /// One model turn, including the truncation-continuation loop and the
    /// extraction validation-retry loop. `history` is read-only here; the
    /// caller appends the final assistant turn once extraction succeeds.
    async fn model_turn(
        &self,
        history: &[Message],
        max_tokens: Option<u32>,
        model_id: &str,
    ) -> Result<AgentResponse, EngineError> {
        let mut attempt_history = history.to_vec();

        for validation_attempt in 0..=MAX_VALIDATION_RETRIES {
            let response = self
                .call_with_continuation(&attempt_history, max_tokens, model_id)
                .await?;

            match extract_agent_response(&response.content) {
                Ok(parsed) => return Ok(parsed),
                Err(validation_error) => {
                    if validation_attempt == MAX_VALIDATION_RETRIES {
                        return Err(EngineError::ValidationError(validation_error));
                    }
                    tracing::warn!(
                        attempt = validation_attempt,
                        error = %validation_error,
                        "model response failed structured extraction, retrying"
                    );
                    attempt_history.push(Message::assistant(response.content));
                    attempt_history.push(Message::user(format!(
                        "Your previous response was not valid JSON matching \
                         {{\"reasoning\": string, \"tool_call\": {{\"tool\": string, \
                         \"parameters\": object}} | null}}. Error: {validation_error}. \
                         Respond again with only the corrected JSON object."
                    )));
                }
            }
        }
        unreachable!("loop always returns by the final iteration")
    }

    /// Calls the provider, retrying with a synthetic continuation turn each
    /// time the transport reports the response was cut off. Never merges
    /// partial JSON across attempts — each retry regenerates from scratch.
    async fn call_with_continuation(
        &self,
        history: &[Message],
        max_tokens: Option<u32>,
        model_id: &str,
    ) -> Result<sa_providers::ChatResponse, EngineError> {
        let mut attempt_history = history.to_vec();
        for _ in 0..=MAX_CONTINUATIONS {
            let request = ChatRequest {
                messages: attempt_history.clone(),
                tools: Vec::new(),
                temperature: None,
                max_tokens,
                json_mode: true,
                model: Some(model_id.to_string()),
            };
            let response = self
                .provider
                .chat(request)
                .await
                .map_err(|e| EngineError::TransportError(e.to_string()))?;

            if response.finish_reason.as_deref() == Some("length") {
                attempt_history.push(Message::assistant(response.content));
                attempt_history.push(Message::user(
                    "Your previous response was cut off before it finished. \
                     Regenerate your complete answer from the beginning."
                        .to_string(),
                ));
                continue;
            }
            return Ok(response);
        }
        Err(EngineError::Truncation)
    }

    /// Tool dispatch (§4.8.5). Returns the JSON text fed back to the model
    /// as the tool result — never propagates as an `Err`, since every
    /// dispatch outcome (unknown tool, denial, execution failure, success)
    /// is a normal continuation of the conversation.
    async fn dispatch_tool(
        &self,
        invocation_id: &str,
        tool_name: &str,
        parameters: Value,
        agent_type: &str,
        agent_config: &AgentConfig,
        project_id: Option<&str>,
    ) -> String {
        let tool_calls = ToolCalls::new(&self.store);
        let params_text = parameters.to_string();

        let Some(tool) = self.tools.get(tool_name) else {
            let tool_call_id = match tool_calls.record_pending(invocation_id, tool_name, &params_text, "unknown") {
                Ok(id) => id,
                Err(e) => return serde_json::json!({"error": e.to_string()}).to_string(),
            };
            let message = format!("Unknown tool: {tool_name}");
            let _ = tool_calls.record_failed(&tool_call_id, &message);
            return serde_json::json!({"error": message}).to_string();
        };

        if !agent_config.allows_tool(tool_name) {
            let tool_call_id = match tool_calls.record_pending(
                invocation_id,
                tool_name,
                &params_text,
                tool.risk_level().as_str(),
            ) {
                Ok(id) => id,
                Err(e) => return serde_json::json!({"error": e.to_string()}).to_string(),
            };
            let message = format!("Tool {tool_name} is not permitted for agent type {agent_type}");
            let _ = tool_calls.record_failed(&tool_call_id, &message);
            return serde_json::json!({"error": message}).to_string();
        }

        let risk_level = tool.risk_level();
        let tool_call_id = match tool_calls.record_pending(
            invocation_id,
            tool_name,
            &params_text,
            risk_level.as_str(),
        ) {
            Ok(id) => id,
            Err(e) => return serde_json::json!({"error": e.to_string()}).to_string(),
        };

        if requires_approval(risk_level, agent_config) {
            let Some(gate) = &self.approval else {
                let message = "tool requires approval but no approval gate is wired in".to_string();
                let _ = tool_calls.record_failed(&tool_call_id, &message);
                return serde_json::json!({"error": message}).to_string();
            };
            let approved = match gate
                .request(tool_name, &parameters, agent_type, project_id, &tool_call_id)
                .await
            {
                Ok(v) => v,
                Err(e) => {
                    let _ = tool_calls.record_failed(&tool_call_id, &e.to_string());
                    return serde_json::json!({"error": e.to_string()}).to_string();
                }
            };
            if !approved {
                let _ = tool_calls.record_denied(&tool_call_id);
                return serde_json::json!({"error": format!("{tool_name} denied by approval gate.")})
                    .to_string();
            }
        }

        match tool.execute(parameters).await {
            Ok(result) => {
                let result_text = result.to_string();
                let _ = tool_calls.record_executed(&tool_call_id, &result_text);
                result_text
            }
            Err(e) => {
                let message = e.to_string();
                let _ = tool_calls.record_failed(&tool_call_id, &message);
                serde_json::json!({"error": message}).to_string()
            }
        }
    }
}

fn requires_approval(risk_level: RiskLevel, agent_config: &AgentConfig) -> bool {
    agent_config
        .approval_required_for
        .iter()
        .any(|level| level == risk_level.as_str())
        || risk_level == RiskLevel::Unknown
}

/// Adapts an `LlmProvider` to the `Summarizer` trait `sa_store::ContextManager`
/// needs for `maybe_summarise`. The store crate doesn't depend on providers,
/// so this thin bridge lives in the engine instead.
struct ProviderSummarizer(Arc<dyn LlmProvider>);

#[async_trait]
impl Summarizer for ProviderSummarizer {
    async fn summarise(&self, prompt: &str) -> DomainResult<String> {
        let response = self
            .0
            .chat(ChatRequest {
                messages: vec![Message::user(prompt.to_string())],
                tools: Vec::new(),
                temperature: None,
                max_tokens: None,
                json_mode: false,
                model: None,
            })
            .await
            .map_err(|e| DomainError::Provider {
                provider: self.0.provider_id().to_string(),
                message: e.to_string(),
            })?;
        Ok(response.content)
    }
}

/// Builds the system message: environment framing, behavioural rules, the
/// `{reasoning, tool_call}` response contract, and the tool catalogue.
/// Ported from `agents/base_prompt.py`'s `build_system_prompt`.
fn build_system_prompt(tools: &[sa_tools::ToolDescriptor]) -> String {
    let catalogue = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You are an autonomous task agent running inside an orchestrator. \
         You operate in a loop: you are given a task, you reason about it, \
         and you may call one tool per turn to make progress.\n\n\
         RULES:\n\
         - Always respond with a single JSON object, nothing else.\n\
         - Call at most one tool per turn.\n\
         - When the task is complete, set \"tool_call\" to null and put your \
         final answer in \"reasoning\".\n\
         - Never fabricate a tool result; wait for the next turn to see it.\n\n\
         RESPONSE FORMAT:\n\
         {{\"reasoning\": \"<your reasoning, or the final answer>\", \
         \"tool_call\": {{\"tool\": \"<tool name>\", \"parameters\": {{...}}}} | null}}\n\n\
         AVAILABLE TOOLS:\n{catalogue}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_domain::capability::LlmCapabilities;
    use sa_providers::ChatResponse;
    use sa_tools::{RiskLevel as TRisk, Tool, ToolError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    fn store() -> Arc<Store> {
        Arc::new(Store::open_in_memory().unwrap())
    }

    struct ScriptedProvider {
        replies: StdMutex<Vec<ChatResponse>>,
        capabilities: LlmCapabilities,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<ChatResponse>) -> Self {
            Self {
                replies: StdMutex::new(replies),
                capabilities: LlmCapabilities::default(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn chat(&self, _req: ChatRequest) -> DomainResult<ChatResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(DomainError::Provider {
                    provider: "scripted".into(),
                    message: "script exhausted".into(),
                });
            }
            Ok(replies.remove(0))
        }
        fn capabilities(&self) -> &LlmCapabilities {
            &self.capabilities
        }
        fn provider_id(&self) -> &str {
            "scripted"
        }
    }

    fn done_response(reasoning: &str) -> ChatResponse {
        ChatResponse {
            content: serde_json::json!({"reasoning": reasoning, "tool_call": null}).to_string(),
            tool_calls: Vec::new(),
            usage: None,
            model: "m".into(),
            finish_reason: Some("stop".into()),
        }
    }

    fn tool_call_response(reasoning: &str, tool: &str, params: Value) -> ChatResponse {
        ChatResponse {
            content: serde_json::json!({
                "reasoning": reasoning,
                "tool_call": {"tool": tool, "parameters": params},
            })
            .to_string(),
            tool_calls: Vec::new(),
            usage: None,
            model: "m".into(),
            finish_reason: Some("stop".into()),
        }
    }

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes input"
        }
        fn parameters_schema(&self) -> &Value {
            static SCHEMA: std::sync::OnceLock<Value> = std::sync::OnceLock::new();
            SCHEMA.get_or_init(|| serde_json::json!({"type": "object", "properties": {}}))
        }
        fn risk_level(&self) -> TRisk {
            TRisk::Low
        }
        async fn call(&self, params: Value) -> Result<Value, ToolError> {
            Ok(params)
        }
    }

    struct Dangerous;

    #[async_trait]
    impl Tool for Dangerous {
        fn name(&self) -> &str {
            "shell_run"
        }
        fn description(&self) -> &str {
            "runs a shell command"
        }
        fn parameters_schema(&self) -> &Value {
            static SCHEMA: std::sync::OnceLock<Value> = std::sync::OnceLock::new();
            SCHEMA.get_or_init(|| serde_json::json!({"type": "object", "properties": {}}))
        }
        fn risk_level(&self) -> TRisk {
            TRisk::High
        }
        async fn call(&self, _params: Value) -> Result<Value, ToolError> {
            Ok(serde_json::json!({"ok": true}))
        }
    }

    fn params(event_id: Option<&'static str>, project_id: Option<&'static str>) -> InvocationParams<'static> {
        params_with_agent_config(event_id, project_id, AgentConfig::default())
    }

    fn params_with_agent_config(
        event_id: Option<&'static str>,
        project_id: Option<&'static str>,
        agent_config: AgentConfig,
    ) -> InvocationParams<'static> {
        InvocationParams {
            event_id,
            agent_type: "task_agent",
            agent_config: Box::leak(Box::new(agent_config)),
            model_name: "local-qwen",
            model_id: "qwen2.5",
            max_tokens: None,
            project_id,
            task_description: "do the thing",
        }
    }

    #[tokio::test]
    async fn immediate_completion_returns_done() {
        let provider = Arc::new(ScriptedProvider::new(vec![done_response("all set")]));
        let invoker = Invoker::new(store(), Arc::new(ToolRegistry::new()), provider, None, 4000);
        let outcome = invoker.run(params(None, None)).await.unwrap();
        assert_eq!(outcome.status, "done");
        assert_eq!(outcome.response, "all set");
        assert!(outcome.steps.is_empty());
    }

    #[tokio::test]
    async fn single_tool_call_then_completion() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response("calling echo", "echo", serde_json::json!({"x": 1})),
            done_response("echoed successfully"),
        ]));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let invoker = Invoker::new(store(), Arc::new(registry), provider, None, 4000);
        let outcome = invoker.run(params(None, None)).await.unwrap();
        assert_eq!(outcome.status, "done");
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0].tool, "echo");
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0]["status"], "executed");
    }

    #[tokio::test]
    async fn unknown_tool_is_recovered_not_fatal() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response("calling ghost", "ghost_tool", serde_json::json!({})),
            done_response("gave up on ghost_tool"),
        ]));
        let invoker = Invoker::new(store(), Arc::new(ToolRegistry::new()), provider, None, 4000);
        let outcome = invoker.run(params(None, None)).await.unwrap();
        assert_eq!(outcome.status, "done");
        assert_eq!(outcome.tool_calls[0]["status"], "failed");
    }

    #[tokio::test]
    async fn high_risk_tool_with_no_gate_is_denied_not_invoked() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response("calling shell", "shell_run", serde_json::json!({})),
            done_response("could not run shell"),
        ]));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Dangerous));
        let invoker = Invoker::new(store(), Arc::new(registry), provider, None, 4000);
        let outcome = invoker.run(params(None, None)).await.unwrap();
        assert_eq!(outcome.status, "done");
        assert_eq!(outcome.tool_calls[0]["status"], "failed");
        assert_ne!(outcome.tool_calls[0]["status"], "executed");
    }

    #[tokio::test]
    async fn high_risk_tool_denied_by_non_interactive_gate() {
        let store_handle = store();
        let gate = Arc::new(ApprovalGate::new(
            store_handle.clone(),
            crate::engine::approval::ApprovalChannel::NonInteractive,
        ));
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response("calling shell", "shell_run", serde_json::json!({})),
            done_response("shell denied"),
        ]));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Dangerous));
        let invoker = Invoker::new(store_handle, Arc::new(registry), provider, Some(gate), 4000);
        let outcome = invoker.run(params(None, None)).await.unwrap();
        assert_eq!(outcome.tool_calls[0]["status"], "denied");
        assert!(outcome.tool_calls[0]["result"].is_null());
    }

    #[tokio::test]
    async fn truncated_response_triggers_continuation() {
        let mut truncated = done_response("partial");
        truncated.finish_reason = Some("length".into());
        let provider = Arc::new(ScriptedProvider::new(vec![truncated, done_response("complete")]));
        let invoker = Invoker::new(store(), Arc::new(ToolRegistry::new()), provider, None, 4000);
        let outcome = invoker.run(params(None, None)).await.unwrap();
        assert_eq!(outcome.status, "done");
        assert_eq!(outcome.response, "complete");
    }

    #[tokio::test]
    async fn exhausted_continuations_fail_the_invocation() {
        let mut replies = Vec::new();
        for _ in 0..=MAX_CONTINUATIONS {
            let mut r = done_response("partial");
            r.finish_reason = Some("length".into());
            replies.push(r);
        }
        let provider = Arc::new(ScriptedProvider::new(replies));
        let invoker = Invoker::new(store(), Arc::new(ToolRegistry::new()), provider, None, 4000);
        let outcome = invoker.run(params(None, None)).await.unwrap();
        assert_eq!(outcome.status, "failed");
    }

    #[tokio::test]
    async fn malformed_json_is_retried_then_recovers() {
        let bad = ChatResponse {
            content: "not json at all".into(),
            tool_calls: Vec::new(),
            usage: None,
            model: "m".into(),
            finish_reason: Some("stop".into()),
        };
        let provider = Arc::new(ScriptedProvider::new(vec![bad, done_response("recovered")]));
        let invoker = Invoker::new(store(), Arc::new(ToolRegistry::new()), provider, None, 4000);
        let outcome = invoker.run(params(None, None)).await.unwrap();
        assert_eq!(outcome.status, "done");
        assert_eq!(outcome.response, "recovered");
    }

    #[tokio::test]
    async fn exhausted_validation_retries_fail_the_invocation() {
        let bad = ChatResponse {
            content: "still not json".into(),
            tool_calls: Vec::new(),
            usage: None,
            model: "m".into(),
            finish_reason: Some("stop".into()),
        };
        let mut replies = Vec::new();
        for _ in 0..=MAX_VALIDATION_RETRIES {
            replies.push(bad.clone());
        }
        let provider = Arc::new(ScriptedProvider::new(replies));
        let invoker = Invoker::new(store(), Arc::new(ToolRegistry::new()), provider, None, 4000);
        let outcome = invoker.run(params(None, None)).await.unwrap();
        assert_eq!(outcome.status, "failed");
    }

    #[tokio::test]
    async fn agent_config_max_iterations_caps_the_loop() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        // Every turn calls the tool and never finishes, so the loop only
        // stops because the per-agent cap is reached, not because the
        // model ran out of script.
        let replies: Vec<ChatResponse> = (0..10)
            .map(|_| tool_call_response("looping", "echo", serde_json::json!({})))
            .collect();
        let provider = Arc::new(ScriptedProvider::new(replies));
        let invoker = Invoker::new(store(), Arc::new(registry), provider, None, 4000);
        let agent_config = AgentConfig {
            max_iterations: 2,
            ..AgentConfig::default()
        };
        let outcome = invoker
            .run(params_with_agent_config(None, None, agent_config))
            .await
            .unwrap();
        assert_eq!(outcome.status, "failed");
        assert_eq!(outcome.steps.len(), 2);
    }

    #[tokio::test]
    async fn project_history_and_summary_updated_on_finish() {
        let store_handle = store();
        ContextManager::new(&store_handle).ensure_project("p1", "demo").unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![done_response("done with project work")]));
        let invoker = Invoker::new(store_handle.clone(), Arc::new(ToolRegistry::new()), provider, None, 4000);
        let outcome = invoker.run(params(None, Some("p1"))).await.unwrap();
        assert_eq!(outcome.status, "done");
        let ctx = ContextManager::new(&store_handle)
            .assemble_context("p1", 4000)
            .unwrap();
        assert!(ctx.contains("done with project work"));
    }

    #[test]
    fn build_system_prompt_lists_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let prompt = build_system_prompt(&registry.schema_for_agent());
        assert!(prompt.contains("\"echo\""));
        assert!(prompt.contains("RESPONSE FORMAT"));
    }
}
