//! # Durable Execution Capability
//!
//! The interface flowlet workflow code is written against, plus an in-memory
//! engine for local and test execution.
//!
//! A workflow is a deterministic state machine: every suspension point (an
//! activity call, a child workflow await) is an emitted [`WorkflowAction`],
//! and the engine feeds results back through the `on_*` callbacks. Activities
//! are the only side-effecting units; each carries its own retry policy and
//! start-to-close timeout.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    InMemoryEngine                      │
//! │  (drives workflow state machines to a terminal state)  │
//! └────────────────────────────────────────────────────────┘
//!          │                                │
//!          ▼                                ▼
//! ┌──────────────────────┐      ┌───────────────────────────┐
//! │   WorkflowRegistry   │      │     ActivityRegistry      │
//! │ (name -> factory)    │      │ (name -> instance, retry) │
//! └──────────────────────┘      └───────────────────────────┘
//! ```
//!
//! A production deployment would swap the in-memory engine for a durable
//! backend (checkpointed history, task-queue dispatch, crash recovery); the
//! workflow and activity code does not change.

pub mod activity;
pub mod engine;
pub mod retry;
pub mod workflow;

pub use activity::{Activity, ActivityContext, ActivityError, ActivityRegistry, AnyActivity};
pub use engine::{AnyWorkflow, EngineError, InMemoryEngine, RegistryError, WorkflowRegistry};
pub use retry::RetryPolicy;
pub use workflow::{ActivityOptions, Workflow, WorkflowAction, WorkflowError};
