// Parent Loop Workflow - Sequential Child Composition
//
// Iterates items, starting one ai_agent_child invocation per item and
// awaiting its result before moving to the next. Children run in their own
// workflow boundary (own identity, own activity retry scope); the parent
// performs no catch or fallback, so the first child failure aborts the run
// with no partial results.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use flowlet_core::LoopItem;
use flowlet_durable::{ActivityError, Workflow, WorkflowAction, WorkflowError};

use crate::ids::scoped_id;
use crate::workflows::agent_child::{AgentChildOutput, AgentChildWorkflow};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentLoopInput {
    /// Items to iterate; each carries `name` and `usermessage`
    #[serde(default)]
    pub items: Vec<LoopItem>,

    #[serde(default)]
    pub system_message: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Forwarded into every child so callers can exercise retry behavior
    #[serde(default)]
    pub fail_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentLoopRecord {
    pub item: LoopItem,
    pub child_result: AgentChildOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentLoopOutput {
    pub run_id: String,
    pub results: Vec<ParentLoopRecord>,
}

#[derive(Debug, Clone)]
enum ParentLoopState {
    Init,
    AwaitingChild { pending_child: String, index: usize },
    Completed,
    Failed,
}

/// Parent workflow spawning one sequential child invocation per item.
pub struct ParentLoopWorkflow {
    input: ParentLoopInput,
    run_id: String,
    state: ParentLoopState,
    results: Vec<ParentLoopRecord>,
    done: Option<ParentLoopOutput>,
    failed: Option<WorkflowError>,
}

impl ParentLoopWorkflow {
    fn schedule_child(&mut self, index: usize) -> Vec<WorkflowAction> {
        let item = &self.input.items[index];
        let name = item.name().unwrap_or("item");
        let child_id = scoped_id(&format!("child-{}", name));
        let usermessage = item.field_text("usermessage").unwrap_or_default();

        self.state = ParentLoopState::AwaitingChild {
            pending_child: child_id.clone(),
            index,
        };

        vec![WorkflowAction::ScheduleChildWorkflow {
            workflow_id: child_id,
            workflow_type: AgentChildWorkflow::TYPE.to_string(),
            input: json!({
                "usermessage": usermessage,
                "system_message": self.input.system_message,
                "model": self.input.model,
                "fail_rate": self.input.fail_rate,
            }),
        }]
    }

    fn complete(&mut self) -> Vec<WorkflowAction> {
        self.state = ParentLoopState::Completed;
        let output = ParentLoopOutput {
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
        self.state = ParentLoopState::Failed;
        self.failed = Some(error.clone());
        vec![WorkflowAction::fail(error)]
    }
}

impl Workflow for ParentLoopWorkflow {
    const TYPE: &'static str = "parent_loop";
    type Input = ParentLoopInput;
    type Output = ParentLoopOutput;

    fn new(input: Self::Input) -> Self {
        Self {
            input,
            run_id: scoped_id("parent-loop"),
            state: ParentLoopState::Init,
            results: Vec::new(),
            done: None,
            failed: None,
        }
    }

    fn on_start(&mut self) -> Vec<WorkflowAction> {
        if self.input.items.is_empty() {
            return self.complete();
        }
        self.schedule_child(0)
    }

    fn on_activity_completed(&mut self, _activity_id: &str, _result: Value) -> Vec<WorkflowAction> {
        // The parent schedules no activities of its own; orchestration only.
        vec![]
    }

    fn on_activity_failed(
        &mut self,
        _activity_id: &str,
        _error: &ActivityError,
    ) -> Vec<WorkflowAction> {
        vec![]
    }

    fn on_child_completed(&mut self, workflow_id: &str, result: Value) -> Vec<WorkflowAction> {
        let index = match &self.state {
            ParentLoopState::AwaitingChild {
                pending_child,
                index,
            } if pending_child == workflow_id => *index,
            _ => return vec![],
        };

        let child_result: AgentChildOutput = match serde_json::from_value(result) {
            Ok(output) => output,
            Err(e) => {
                return self.fail(WorkflowError::new(format!(
                    "unexpected child result: {}",
                    e
                )))
            }
        };

        self.results.push(ParentLoopRecord {
            item: self.input.items[index].clone(),
            child_result,
        });

        let next = index + 1;
        if next < self.input.items.len() {
            self.schedule_child(next)
        } else {
            self.complete()
        }
    }

    fn on_child_failed(&mut self, workflow_id: &str, error: &WorkflowError) -> Vec<WorkflowAction> {
        self.fail(
            WorkflowError::new(format!(
                "child workflow {} failed: {}",
                workflow_id, error.message
            ))
            .with_code(error.code.clone().unwrap_or_else(|| "CHILD_FAILURE".to_string())),
        )
    }

    fn is_completed(&self) -> bool {
        matches!(
            self.state,
            ParentLoopState::Completed | ParentLoopState::Failed
        )
    }

    fn result(&self) -> Option<Self::Output> {
        self.done.clone()
    }

    fn error(&self) -> Option<WorkflowError> {
        self.failed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items(values: serde_json::Value) -> Vec<LoopItem> {
        serde_json::from_value(values).unwrap()
    }

    fn start_input() -> ParentLoopInput {
        ParentLoopInput {
            items: items(json!([
                {"name": "First_Item", "usermessage": "msg one"},
                {"name": "second", "usermessage": "msg two"},
            ])),
            system_message: None,
            model: None,
            fail_rate: None,
        }
    }

    fn pending_child(workflow: &ParentLoopWorkflow) -> String {
        match &workflow.state {
            ParentLoopState::AwaitingChild { pending_child, .. } => pending_child.clone(),
            other => panic!("expected AwaitingChild, got {:?}", other),
        }
    }

    #[test]
    fn test_schedules_child_with_item_message_and_scoped_id() {
        let mut workflow = ParentLoopWorkflow::new(start_input());
        let actions = workflow.on_start();

        match &actions[..] {
            [WorkflowAction::ScheduleChildWorkflow {
                workflow_id,
                workflow_type,
                input,
            }] => {
                assert_eq!(workflow_type, "ai_agent_child");
                assert_eq!(input["usermessage"], "msg one");
                assert!(workflow_id.starts_with("child-firstitem-"));
                assert_eq!(*workflow_id, workflow_id.to_lowercase());
            }
            other => panic!("expected ScheduleChildWorkflow, got {:?}", other),
        }
    }

    #[test]
    fn test_sequential_children_then_complete() {
        let mut workflow = ParentLoopWorkflow::new(start_input());
        workflow.on_start();

        let first = pending_child(&workflow);
        let actions = workflow.on_child_completed(
            &first,
            json!({"usermessage": "msg one", "response": "r1"}),
        );
        match &actions[..] {
            [WorkflowAction::ScheduleChildWorkflow { input, .. }] => {
                assert_eq!(input["usermessage"], "msg two");
            }
            other => panic!("expected second child, got {:?}", other),
        }

        let second = pending_child(&workflow);
        let actions = workflow.on_child_completed(
            &second,
            json!({"usermessage": "msg two", "response": "r2"}),
        );
        assert!(matches!(
            actions.as_slice(),
            [WorkflowAction::CompleteWorkflow { .. }]
        ));

        let output = workflow.result().unwrap();
        assert_eq!(output.results.len(), 2);
        assert_eq!(output.results[0].child_result.response, "r1");
        assert_eq!(output.results[1].child_result.response, "r2");
        assert!(output.run_id.starts_with("parent-loop-"));
    }

    #[test]
    fn test_first_child_failure_fails_parent() {
        let mut workflow = ParentLoopWorkflow::new(start_input());
        workflow.on_start();

        let first = pending_child(&workflow);
        let error = WorkflowError::new("activity chat-1 failed: Simulated AI failure")
            .with_code("SIMULATED_FAILURE");
        let actions = workflow.on_child_failed(&first, &error);

        assert!(matches!(
            actions.as_slice(),
            [WorkflowAction::FailWorkflow { .. }]
        ));
        assert!(workflow.is_completed());
        // No partial results survive the failure.
        assert!(workflow.result().is_none());
    }

    #[test]
    fn test_empty_items_completes_immediately() {
        let mut workflow = ParentLoopWorkflow::new(ParentLoopInput {
            items: vec![],
            system_message: None,
            model: None,
            fail_rate: None,
        });

        workflow.on_start();
        let output = workflow.result().unwrap();
        assert!(output.results.is_empty());
        assert!(output.run_id.starts_with("parent-loop-"));
    }

    #[test]
    fn test_unknown_child_id_is_ignored() {
        let mut workflow = ParentLoopWorkflow::new(start_input());
        workflow.on_start();

        let actions = workflow.on_child_completed(
            "child-stranger-0",
            json!({"usermessage": "x", "response": "y"}),
        );
        assert!(actions.is_empty());
        assert!(!workflow.is_completed());
    }
}
