// Simple Define Workflow - Conditional Skip Loop
//
// Iterates items sequentially behind a single workflow-level boolean gate.
// Gate false: every item is recorded as skipped and no AI call happens.
// Gate true: one ai_define_term call per item.
//
// The gate is deliberately uniform across the run. Items could carry a
// per-item eligibility field, but the source automation does not, so the
// gate stays a single boolean rather than silently generalizing.

use serde::{Deserialize, Serialize};
use serde_json::json;

use flowlet_core::LoopItem;
use flowlet_durable::{Activity, ActivityError, Workflow, WorkflowAction, WorkflowError};

use crate::activities::{ai_activity_options, AiDefineTermActivity, AiDefineTermOutput};
use crate::ids::scoped_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleDefineInput {
    #[serde(default)]
    pub items: Vec<LoopItem>,

    #[serde(default)]
    pub system_message: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Workflow-level gate; false skips every item (default true)
    #[serde(default = "default_condition_allow")]
    pub condition_allow: bool,

    #[serde(default)]
    pub fail_rate: Option<f64>,
}

fn default_condition_allow() -> bool {
    true
}

/// One per-item outcome record: either a skip marker or the AI result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub input: LoopItem,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiDefineTermOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleDefineOutput {
    pub run_id: String,
    pub processed: Vec<ProcessedRecord>,
}

#[derive(Debug, Clone)]
enum SimpleDefineState {
    Init,
    AwaitingDefine {
        pending_activity: String,
        index: usize,
    },
    Completed,
    Failed,
}

/// Conditional skip workflow over items with per-item define calls.
pub struct SimpleDefineWorkflow {
    input: SimpleDefineInput,
    run_id: String,
    state: SimpleDefineState,
    processed: Vec<ProcessedRecord>,
    activity_seq: u32,
    done: Option<SimpleDefineOutput>,
    failed: Option<WorkflowError>,
}

impl SimpleDefineWorkflow {
    fn next_activity_id(&mut self) -> String {
        self.activity_seq += 1;
        format!("define-{}", self.activity_seq)
    }

    fn schedule_item(&mut self, index: usize) -> Vec<WorkflowAction> {
        let item = &self.input.items[index];
        let name = item.name().unwrap_or_default().to_string();
        let activity_id = self.next_activity_id();

        self.state = SimpleDefineState::AwaitingDefine {
            pending_activity: activity_id.clone(),
            index,
        };

        vec![WorkflowAction::ScheduleActivity {
            activity_id,
            activity_type: AiDefineTermActivity::TYPE.to_string(),
            input: json!({
                "name": name,
                "system_message": self.input.system_message,
                "model": self.input.model,
                "fail_rate": self.input.fail_rate,
            }),
            options: ai_activity_options(),
        }]
    }

    fn complete(&mut self) -> Vec<WorkflowAction> {
        self.state = SimpleDefineState::Completed;
        let output = SimpleDefineOutput {
            run_id: self.run_id.clone(),
            processed: self.processed.clone(),
        };

        let result = match serde_json::to_value(&output) {
            Ok(value) => value,
            Err(e) => return self.fail(WorkflowError::new(format!("output serialization: {}", e))),
        };

        self.done = Some(output);
        vec![WorkflowAction::complete(result)]
    }

    fn fail(&mut self, error: WorkflowError) -> Vec<WorkflowAction> {
        self.state = SimpleDefineState::Failed;
        self.failed = Some(error.clone());
        vec![WorkflowAction::fail(error)]
    }
}

impl Workflow for SimpleDefineWorkflow {
    const TYPE: &'static str = "n8n_simple";
    type Input = SimpleDefineInput;
    type Output = SimpleDefineOutput;

    fn new(input: Self::Input) -> Self {
        Self {
            input,
            run_id: scoped_id("n8n-simple"),
            state: SimpleDefineState::Init,
            processed: Vec::new(),
            activity_seq: 0,
            done: None,
            failed: None,
        }
    }

    fn on_start(&mut self) -> Vec<WorkflowAction> {
        if !self.input.condition_allow {
            // Gate closed: record every item as skipped, zero AI calls.
            self.processed = self
                .input
                .items
                .iter()
                .map(|item| ProcessedRecord {
                    input: item.clone(),
                    skipped: true,
                    ai: None,
                })
                .collect();
            return self.complete();
        }

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
        let index = match &self.state {
            SimpleDefineState::AwaitingDefine {
                pending_activity,
                index,
            } if pending_activity == activity_id => *index,
            _ => return vec![],
        };

        let ai: AiDefineTermOutput = match serde_json::from_value(result) {
            Ok(output) => output,
            Err(e) => {
                return self.fail(WorkflowError::new(format!(
                    "unexpected ai_define_term result: {}",
                    e
                )))
            }
        };

        self.processed.push(ProcessedRecord {
            input: self.input.items[index].clone(),
            skipped: false,
            ai: Some(ai),
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
            SimpleDefineState::Completed | SimpleDefineState::Failed
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

    fn input_with_gate(condition_allow: bool) -> SimpleDefineInput {
        SimpleDefineInput {
            items: items(json!([{"name": "wine"}, {"name": "tea", "code": 2}])),
            system_message: None,
            model: None,
            condition_allow,
            fail_rate: None,
        }
    }

    #[test]
    fn test_gate_defaults_to_true() {
        let input: SimpleDefineInput = serde_json::from_value(json!({"items": []})).unwrap();
        assert!(input.condition_allow);
    }

    #[test]
    fn test_gate_false_skips_everything() {
        let mut workflow = SimpleDefineWorkflow::new(input_with_gate(false));
        let actions = workflow.on_start();

        assert!(matches!(
            actions.as_slice(),
            [WorkflowAction::CompleteWorkflow { .. }]
        ));

        let output = workflow.result().unwrap();
        assert_eq!(output.processed.len(), 2);
        assert!(output.processed.iter().all(|r| r.skipped && r.ai.is_none()));
        assert!(output.run_id.starts_with("n8n-simple-"));
    }

    #[test]
    fn test_gate_true_defines_every_item() {
        let mut workflow = SimpleDefineWorkflow::new(input_with_gate(true));

        let actions = workflow.on_start();
        let first_id = match &actions[..] {
            [WorkflowAction::ScheduleActivity {
                activity_id,
                activity_type,
                input,
                ..
            }] => {
                assert_eq!(activity_type, "ai_define_term");
                assert_eq!(input["name"], "wine");
                activity_id.clone()
            }
            other => panic!("expected ScheduleActivity, got {:?}", other),
        };

        let actions =
            workflow.on_activity_completed(&first_id, json!({"name": "wine", "definition": "d1"}));
        let second_id = match &actions[..] {
            [WorkflowAction::ScheduleActivity {
                activity_id, input, ..
            }] => {
                assert_eq!(input["name"], "tea");
                activity_id.clone()
            }
            other => panic!("expected ScheduleActivity, got {:?}", other),
        };

        let actions =
            workflow.on_activity_completed(&second_id, json!({"name": "tea", "definition": "d2"}));
        assert!(matches!(
            actions.as_slice(),
            [WorkflowAction::CompleteWorkflow { .. }]
        ));

        let output = workflow.result().unwrap();
        assert_eq!(output.processed.len(), 2);
        assert!(output.processed.iter().all(|r| !r.skipped));
        assert_eq!(
            output.processed[0].ai.as_ref().unwrap().definition,
            "d1"
        );
    }

    #[test]
    fn test_empty_items_completes_immediately() {
        let mut workflow = SimpleDefineWorkflow::new(SimpleDefineInput {
            items: vec![],
            system_message: None,
            model: None,
            condition_allow: true,
            fail_rate: None,
        });

        workflow.on_start();
        let output = workflow.result().unwrap();
        assert!(output.processed.is_empty());
    }

    #[test]
    fn test_define_failure_fails_workflow() {
        let mut workflow = SimpleDefineWorkflow::new(input_with_gate(true));
        let actions = workflow.on_start();
        let pending = match &actions[..] {
            [WorkflowAction::ScheduleActivity { activity_id, .. }] => activity_id.clone(),
            other => panic!("expected ScheduleActivity, got {:?}", other),
        };

        let error = ActivityError::retryable("Simulated AI failure").with_type("SIMULATED_FAILURE");
        let actions = workflow.on_activity_failed(&pending, &error);

        assert!(matches!(
            actions.as_slice(),
            [WorkflowAction::FailWorkflow { .. }]
        ));
        assert!(workflow.result().is_none());
    }
}
