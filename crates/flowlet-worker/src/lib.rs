//! # Flowlet Worker
//!
//! Durable workflow and activity definitions replicating a handful of simple
//! n8n automation flows: looping over items with per-item AI calls, a
//! conditional skip variant, and sequential parent/child composition.
//!
//! The durable-execution machinery (retries, timeouts, replay, dispatch)
//! lives behind the `flowlet-durable` capability traits; this crate only
//! defines the state machines and the two AI activities they call.

pub mod activities;
pub mod config;
pub mod ids;
pub mod workflows;

pub use activities::{AiChatActivity, AiDefineTermActivity};
pub use config::WorkerConfig;
pub use workflows::{build_engine, UnknownWorkflow, WorkflowKind};
