//! Event producers (C3). Adapters only ever push onto the queue (or, for
//! HTTP, additionally block on a waiter) — none of them touch routing,
//! invocation, or the store's write-once tables directly.

pub mod http;
pub mod timer;
