//! Durable store (C1), event queue (C2), and context manager (C5).
//!
//! A single embedded SQLite database backs all persisted entities
//! (events, invocations, tool calls, approvals, projects, history, tasks).
//! Every table module builds its writes on [`store::Store::with_tx`].

pub mod approvals;
pub mod context;
pub mod ids;
pub mod invocations;
pub mod queue;
pub mod store;
pub mod tasks;
pub mod tool_calls;

pub use approvals::{Approval, Approvals};
pub use context::{ContextManager, HistoryEntry, Project, Summarizer};
pub use invocations::{Invocation, Invocations};
pub use queue::{Event, EventQueue};
pub use store::Store;
pub use tasks::{Task, Tasks};
pub use tool_calls::{ToolCall, ToolCalls};
