//! The invocation engine (C4 router, C7 approval gate, C8 agent loop) plus
//! the fault taxonomy shared across them (§7).

pub mod approval;
pub mod error;
pub mod invoker;
pub mod router;

pub use approval::{ApprovalChannel, ApprovalGate};
pub use error::EngineError;
pub use invoker::{InvocationOutcome, InvocationParams, Invoker, Step};
pub use router::{resolve_project_id, route_event, RoutedEvent};
