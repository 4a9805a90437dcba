//! Workflow definitions and the closed dispatch table
//!
//! Workflow names form a closed set resolved at process start. Unknown names
//! are rejected before any execution begins.

pub mod agent_child;
pub mod agent_loop;
pub mod parent_loop;
pub mod simple_define;

use std::str::FromStr;
use std::sync::Arc;

use flowlet_core::LlmDriver;
use flowlet_durable::{InMemoryEngine, Workflow};

use crate::activities::{AiChatActivity, AiDefineTermActivity};

pub use agent_child::AgentChildWorkflow;
pub use agent_loop::AgentLoopWorkflow;
pub use parent_loop::ParentLoopWorkflow;
pub use simple_define::SimpleDefineWorkflow;

/// Closed set of invocable workflow kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    AgentLoop,
    SimpleDefine,
    AgentChild,
    ParentLoop,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 4] = [
        WorkflowKind::AgentLoop,
        WorkflowKind::SimpleDefine,
        WorkflowKind::AgentChild,
        WorkflowKind::ParentLoop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::AgentLoop => AgentLoopWorkflow::TYPE,
            WorkflowKind::SimpleDefine => SimpleDefineWorkflow::TYPE,
            WorkflowKind::AgentChild => AgentChildWorkflow::TYPE,
            WorkflowKind::ParentLoop => ParentLoopWorkflow::TYPE,
        }
    }
}

/// Unknown workflow name, rejected before execution.
#[derive(Debug, thiserror::Error)]
#[error("unknown workflow: {name} (expected one of: agent_loop, n8n_simple, ai_agent_child, parent_loop)")]
pub struct UnknownWorkflow {
    pub name: String,
}

impl FromStr for WorkflowKind {
    type Err = UnknownWorkflow;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownWorkflow {
                name: s.to_string(),
            })
    }
}

/// Build an engine with every workflow and activity registered.
pub fn build_engine(driver: Arc<dyn LlmDriver>) -> InMemoryEngine {
    let mut engine = InMemoryEngine::new();

    engine.register_workflow::<AgentLoopWorkflow>();
    engine.register_workflow::<SimpleDefineWorkflow>();
    engine.register_workflow::<AgentChildWorkflow>();
    engine.register_workflow::<ParentLoopWorkflow>();

    engine.register_activity(AiDefineTermActivity::new(driver.clone()));
    engine.register_activity(AiChatActivity::new(driver));

    engine
}
