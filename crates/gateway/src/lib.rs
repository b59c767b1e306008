//! `sa-gateway`: the persistent multi-source agent orchestration runtime.
//!
//! Wires the durable store (`sa_store`), tool registry (`sa_tools`), and
//! LLM providers (`sa_providers`) into the supervisor loop (C10) that reads
//! events off the queue, routes them (C4), runs the agent invocation engine
//! (C8) with its approval gate (C7), and serves the HTTP front-end (C9).

pub mod adapters;
pub mod api;
pub mod cli;
pub mod engine;
pub mod state;
