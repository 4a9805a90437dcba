// AI Agent Child Workflow - One-Shot Chat Wrapper
//
// A single request/response AI call wrapped in its own workflow boundary so
// parent workflows get independent retry and failure isolation per call.
// Also registered as a top-level workflow; it is independently invocable.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use flowlet_durable::{Activity, ActivityError, Workflow, WorkflowAction, WorkflowError};

use crate::activities::{ai_activity_options, AiChatActivity, AiChatOutput};

/// Persona applied when the caller supplies none; differs from the loop
/// workflows' assistant default.
pub const CHILD_SYSTEM_MESSAGE: &str = "You are a helpful AI agent";

/// Model applied when the caller supplies none.
pub const CHILD_DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentChildInput {
    pub usermessage: String,

    #[serde(default)]
    pub system_message: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Forwarded into the chat call so callers can exercise retry behavior
    #[serde(default)]
    pub fail_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentChildOutput {
    pub usermessage: String,
    pub response: String,
}

#[derive(Debug, Clone)]
enum AgentChildState {
    Init,
    AwaitingChat { pending_activity: String },
    Completed,
    Failed,
}

/// One-shot chat workflow: one ai_chat call, then done.
pub struct AgentChildWorkflow {
    input: AgentChildInput,
    state: AgentChildState,
    done: Option<AgentChildOutput>,
    failed: Option<WorkflowError>,
}

impl AgentChildWorkflow {
    fn fail(&mut self, error: WorkflowError) -> Vec<WorkflowAction> {
        self.state = AgentChildState::Failed;
        self.failed = Some(error.clone());
        vec![WorkflowAction::fail(error)]
    }
}

impl Workflow for AgentChildWorkflow {
    const TYPE: &'static str = "ai_agent_child";
    type Input = AgentChildInput;
    type Output = AgentChildOutput;

    fn new(input: Self::Input) -> Self {
        Self {
            input,
            state: AgentChildState::Init,
            done: None,
            failed: None,
        }
    }

    fn on_start(&mut self) -> Vec<WorkflowAction> {
        let activity_id = "chat-1".to_string();
        self.state = AgentChildState::AwaitingChat {
            pending_activity: activity_id.clone(),
        };

        let system_message = self
            .input
            .system_message
            .clone()
            .unwrap_or_else(|| CHILD_SYSTEM_MESSAGE.to_string());
        let model = self
            .input
            .model
            .clone()
            .unwrap_or_else(|| CHILD_DEFAULT_MODEL.to_string());

        // The one-shot call gets a longer start-to-close than the loop
        // workflows' per-item calls.
        vec![WorkflowAction::ScheduleActivity {
            activity_id,
            activity_type: AiChatActivity::TYPE.to_string(),
            input: json!({
                "system_message": system_message,
                "user_text": self.input.usermessage,
                "model": model,
                "fail_rate": self.input.fail_rate,
            }),
            options: ai_activity_options()
                .with_start_to_close_timeout(Duration::from_secs(300)),
        }]
    }

    fn on_activity_completed(
        &mut self,
        activity_id: &str,
        result: serde_json::Value,
    ) -> Vec<WorkflowAction> {
        match &self.state {
            AgentChildState::AwaitingChat { pending_activity }
                if pending_activity == activity_id => {}
            _ => return vec![],
        }

        let output: AiChatOutput = match serde_json::from_value(result) {
            Ok(output) => output,
            Err(e) => {
                return self.fail(WorkflowError::new(format!(
                    "unexpected ai_chat result: {}",
                    e
                )))
            }
        };

        self.state = AgentChildState::Completed;
        let output = AgentChildOutput {
            usermessage: self.input.usermessage.clone(),
            response: output.response,
        };

        let result = match serde_json::to_value(&output) {
            Ok(value) => value,
            Err(e) => return self.fail(WorkflowError::new(format!("output serialization: {}", e))),
        };

        self.done = Some(output);
        vec![WorkflowAction::complete(result)]
    }

    fn on_activity_failed(
        &mut self,
        activity_id: &str,
        error: &ActivityError,
    ) -> Vec<WorkflowAction> {
        self.fail(WorkflowError::from_activity(activity_id, error))
    }

    fn is_completed(&self) -> bool {
        matches!(
            self.state,
            AgentChildState::Completed | AgentChildState::Failed
        )
    }

    fn result(&self) -> Option<Self::Output> {
        self.done.clone()
    }

    fn error(&self) -> Option<WorkflowError> {
        self.failed.clone()
    }
}
