//! The invocation-loop fault taxonomy (§7). `sa_domain::error::Error` remains
//! the lower-level IO/JSON/store error type; `EngineError` wraps it for the
//! faults specific to routing, approval, and the agent loop.
//!
//! Most of these are *recovered locally* — fed back to the model as a tool
//! result, or resolved as a failed event — rather than propagated as a Rust
//! `Err` all the way out. Only `TransportError`, `StoreError`, `Truncation`,
//! and `IterationCap` actually terminate an invocation.

use sa_domain::error::Error as DomainError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no routing rule matched source={source:?} type={event_type:?}")]
    UnroutableEvent { source: String, event_type: String },

    #[error("parameter validation failed: {0}")]
    ValidationError(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool call denied by approval gate")]
    ApprovalDenied,

    #[error("tool execution failed: {0}")]
    ToolExecutionError(String),

    #[error("llm transport failed: {0}")]
    TransportError(String),

    #[error("response truncated by model token limit (continuation cap exhausted)")]
    Truncation,

    #[error("iteration cap reached without task completion")]
    IterationCap,

    #[error(transparent)]
    StoreError(#[from] DomainError),
}
