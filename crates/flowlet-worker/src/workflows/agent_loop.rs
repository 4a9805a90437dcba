// Agent Loop Workflow - Single-Level Item Loop
//
// Iterates items strictly sequentially: render the text template for item i,
// call the ai_chat activity, record the outcome, then move to item i+1. The
// accumulator preserves input order because nothing runs concurrently.
//
// Failure policy: an exhausted activity failure fails the whole invocation;
// there is no partial-result return path.

use serde::{Deserialize, Serialize};
use serde_json::json;

use flowlet_core::{render, LoopItem};
use flowlet_durable::{Activity, ActivityError, Workflow, WorkflowAction, WorkflowError};

use crate::activities::{ai_activity_options, AiChatActivity, AiChatOutput};
use crate::ids::scoped_id;

/// Workflow input for the single-level loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLoopInput {
    /// Items to iterate, in order
    #[serde(default)]
    pub items: Vec<LoopItem>,

    /// Template rendered once per item with the loop index and item fields
    pub text_template: String,

    #[serde(default)]
    pub system_message: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Probability in [0,1] of injecting a simulated activity failure
    #[serde(default)]
    pub fail_rate: Option<f64>,
}

/// One per-item outcome record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLoopRecord {
    pub index: usize,
    pub input: LoopItem,
    pub user_text: String,
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLoopOutput {
    pub run_id: String,
    pub results: Vec<AgentLoopRecord>,
}

#[derive(Debug, Clone)]
enum AgentLoopState {
    Init,
    AwaitingChat {
        pending_activity: String,
        index: usize,
        user_text: String,
    },
    Completed,
    Failed,
}

/// Single-level loop workflow over items with per-item AI chat calls.
pub struct AgentLoopWorkflow {
    input: AgentLoopInput,
    run_id: String,
    state: AgentLoopState,
    results: Vec<AgentLoopRecord>,
    activity_seq: u32,
    done: Option<AgentLoopOutput>,
    failed: Option<WorkflowError>,
}

impl AgentLoopWorkflow {
    fn next_activity_id(&mut self) -> String {
        self.activity_seq += 1;
        format!("chat-{}", self.activity_seq)
    }

    /// Schedule the chat call for the item at `index`.
    fn schedule_item(&mut self, index: usize) -> Vec<WorkflowAction> {
        let item = &self.input.items[index];
        let user_text = render(&self.input.text_template, index, item);
        let activity_id = self.next_activity_id();

        self.state = AgentLoopState::AwaitingChat {
            pending_activity: activity_id.clone(),
            index,
            user_text: user_text.clone(),
        };

        vec![WorkflowAction::ScheduleActivity {
            activity_id,
            activity_type: AiChatActivity::TYPE.to_string(),
            input: json!({
                "system_message": self.input.system_message,
                "user_text": user_text,
                "model": self.input.model,
                "fail_rate": self.input.fail_rate,
            }),
            options: ai_activity_options(),
        }]
    }

    fn complete(&mut self) -> Vec<WorkflowAction> {
        self.state = AgentLoopState::Completed;
        let output = AgentLoopOutput {
            run_id: self.run_id.clone(),
            results: self.results.clone(),
        };

        let result = match serde_json::to_value(&output) {
            Ok(value) => value,
            Err(e) => return self.fail(WorkflowError::new(format!("output serialization: {}", e))),
        };

        self.done = Some(output);
        vec![WorkflowAction::complete(result)]
    }

    fn fail(&mut self, error: WorkflowError) -> Vec<WorkflowAction> {
        self.state = AgentLoopState::Failed;
        self.failed = Some(error.clone());
        vec![WorkflowAction::fail(error)]
    }
}

impl Workflow for AgentLoopWorkflow {
    const TYPE: &'static str = "agent_loop";
    type Input = AgentLoopInput;
    type Output = AgentLoopOutput;

    fn new(input: Self::Input) -> Self {
        Self {
            input,
            run_id: scoped_id("agent-loop"),
            state: AgentLoopState::Init,
            results: Vec::new(),
            activity_seq: 0,
            done: None,
            failed: None,
        }
    }

    fn on_start(&mut self) -> Vec<WorkflowAction> {
        if self.input.items.is_empty() {
            return self.complete();
        }
        self.schedule_item(0)
    }

    fn on_activity_completed(
        &mut self,
        activity_id: &str,
        result: serde_json::Value,
    ) -> Vec<WorkflowAction> {
        let (index, user_text) = match &self.state {
            AgentLoopState::AwaitingChat {
                pending_activity,
                index,
                user_text,
            } if pending_activity == activity_id => (*index, user_text.clone()),
            _ => return vec![],
        };

        let output: AiChatOutput = match serde_json::from_value(result) {
            Ok(output) => output,
            Err(e) => {
                return self.fail(WorkflowError::new(format!(
                    "unexpected ai_chat result: {}",
                    e
                )))
            }
        };

        self.results.push(AgentLoopRecord {
            index,
            input: self.input.items[index].clone(),
            user_text,
            response: output.response,
        });

        let next = index + 1;
        if next < self.input.items.len() {
            self.schedule_item(next)
        } else {
            self.complete()
        }
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
            AgentLoopState::Completed | AgentLoopState::Failed
        )
    }

    fn result(&self) -> Option<Self::Output> {
        self.done.clone()
    }

    fn error(&self) -> Option<WorkflowError> {
        self.failed.clone()
    }
}
