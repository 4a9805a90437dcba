//! Workflow trait, actions, and activity options

use std::fmt;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::activity::ActivityError;
use crate::retry::RetryPolicy;

/// Error type for workflow failures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowError {
    /// Error message
    pub message: String,

    /// Error code for programmatic handling
    pub code: Option<String>,
}

impl WorkflowError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Wrap an exhausted activity failure, carrying its error type forward.
    pub fn from_activity(activity_id: &str, error: &ActivityError) -> Self {
        Self {
            message: format!("activity {} failed: {}", activity_id, error.message),
            code: error.error_type.clone(),
        }
    }
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for WorkflowError {}

/// Actions a workflow can request in response to events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowAction {
    /// Schedule an activity for execution
    ScheduleActivity {
        /// Unique identifier for this activity call within the workflow
        activity_id: String,

        /// Type of activity to execute (used to look up in the registry)
        activity_type: String,

        /// Input data for the activity (JSON)
        input: Value,

        /// Execution options (retries, timeout)
        options: ActivityOptions,
    },

    /// Start a child workflow and await its result
    ScheduleChildWorkflow {
        /// Identifier for the child invocation
        workflow_id: String,

        /// Type of workflow to start
        workflow_type: String,

        /// Input for the child workflow
        input: Value,
    },

    /// Complete the workflow successfully with a result
    CompleteWorkflow { result: Value },

    /// Fail the workflow with an error
    FailWorkflow { error: WorkflowError },

    /// No action (event handling triggered no new work)
    None,
}

impl WorkflowAction {
    /// Schedule-activity action with default options
    pub fn schedule_activity(
        activity_id: impl Into<String>,
        activity_type: impl Into<String>,
        input: Value,
    ) -> Self {
        Self::ScheduleActivity {
            activity_id: activity_id.into(),
            activity_type: activity_type.into(),
            input,
            options: ActivityOptions::default(),
        }
    }

    pub fn complete(result: Value) -> Self {
        Self::CompleteWorkflow { result }
    }

    pub fn fail(error: WorkflowError) -> Self {
        Self::FailWorkflow { error }
    }
}

/// Options for activity execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityOptions {
    /// Retry policy for this activity call
    pub retry_policy: RetryPolicy,

    /// Maximum time for one attempt, start to close
    #[serde(with = "duration_millis")]
    pub start_to_close_timeout: Duration,
}

impl Default for ActivityOptions {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            start_to_close_timeout: Duration::from_secs(60),
        }
    }
}

impl ActivityOptions {
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_start_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout = timeout;
        self
    }
}

/// A workflow is a deterministic state machine driven by events.
///
/// Given the same sequence of events a workflow must produce the same
/// sequence of actions; this is what makes replay-based recovery possible on
/// a durable backend. Workflow code must therefore stay pure between emitted
/// actions: no I/O, no wall-clock reads, no uncontrolled randomness.
pub trait Workflow: Send + Sync + 'static {
    /// Unique type identifier, used to look up the workflow in the registry
    const TYPE: &'static str;

    /// Input type for starting the workflow
    type Input: Serialize + DeserializeOwned + Send + Clone;

    /// Output type when the workflow completes successfully
    type Output: Serialize + DeserializeOwned + Send;

    /// Create a new instance from input (called on start and on replay)
    fn new(input: Self::Input) -> Self;

    /// Called when the workflow starts
    fn on_start(&mut self) -> Vec<WorkflowAction>;

    /// Called when an activity completes successfully
    fn on_activity_completed(&mut self, activity_id: &str, result: Value) -> Vec<WorkflowAction>;

    /// Called when an activity fails (after all retries exhausted)
    fn on_activity_failed(
        &mut self,
        activity_id: &str,
        error: &ActivityError,
    ) -> Vec<WorkflowAction>;

    /// Called when a child workflow completes successfully
    fn on_child_completed(&mut self, workflow_id: &str, result: Value) -> Vec<WorkflowAction> {
        let _ = (workflow_id, result);
        vec![]
    }

    /// Called when a child workflow fails terminally
    fn on_child_failed(&mut self, workflow_id: &str, error: &WorkflowError) -> Vec<WorkflowAction> {
        let _ = (workflow_id, error);
        vec![]
    }

    /// Check if the workflow has reached a terminal state
    fn is_completed(&self) -> bool;

    /// The workflow result, if completed successfully
    fn result(&self) -> Option<Self::Output>;

    /// The workflow error, if failed
    fn error(&self) -> Option<WorkflowError> {
        None
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
