//! Workflow registry and the in-memory engine
//!
//! The engine drives workflow state machines to a terminal state. Activities
//! execute inline under their start-to-close timeout with the call's retry
//! policy applied; child workflows recurse through the same engine with their
//! own identity and retry scope. Iteration is strictly sequential: one action
//! is in flight at a time, so results are delivered in the order the workflow
//! requested them.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::activity::{ActivityContext, ActivityError, ActivityRegistry};
use crate::workflow::{ActivityOptions, Workflow, WorkflowAction, WorkflowError};

/// Type-erased workflow interface used by the engine.
pub trait AnyWorkflow: Send + Sync {
    fn workflow_type(&self) -> &'static str;
    fn on_start(&mut self) -> Vec<WorkflowAction>;
    fn on_activity_completed(&mut self, activity_id: &str, result: Value) -> Vec<WorkflowAction>;
    fn on_activity_failed(&mut self, activity_id: &str, error: &ActivityError)
        -> Vec<WorkflowAction>;
    fn on_child_completed(&mut self, workflow_id: &str, result: Value) -> Vec<WorkflowAction>;
    fn on_child_failed(&mut self, workflow_id: &str, error: &WorkflowError) -> Vec<WorkflowAction>;
    fn is_completed(&self) -> bool;
}

struct WorkflowWrapper<W: Workflow> {
    inner: W,
}

impl<W: Workflow> AnyWorkflow for WorkflowWrapper<W> {
    fn workflow_type(&self) -> &'static str {
        W::TYPE
    }

    fn on_start(&mut self) -> Vec<WorkflowAction> {
        self.inner.on_start()
    }

    fn on_activity_completed(&mut self, activity_id: &str, result: Value) -> Vec<WorkflowAction> {
        self.inner.on_activity_completed(activity_id, result)
    }

    fn on_activity_failed(
        &mut self,
        activity_id: &str,
        error: &ActivityError,
    ) -> Vec<WorkflowAction> {
        self.inner.on_activity_failed(activity_id, error)
    }

    fn on_child_completed(&mut self, workflow_id: &str, result: Value) -> Vec<WorkflowAction> {
        self.inner.on_child_completed(workflow_id, result)
    }

    fn on_child_failed(&mut self, workflow_id: &str, error: &WorkflowError) -> Vec<WorkflowAction> {
        self.inner.on_child_failed(workflow_id, error)
    }

    fn is_completed(&self) -> bool {
        self.inner.is_completed()
    }
}

/// Factory function creating a workflow instance from JSON input
pub type WorkflowFactory =
    Box<dyn Fn(Value) -> Result<Box<dyn AnyWorkflow>, serde_json::Error> + Send + Sync>;

/// Errors from registry lookups.
///
/// Both variants surface before any durable execution begins, which makes
/// them the non-retriable validation errors of the invocation surface.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Workflow type not registered
    #[error("unknown workflow type: {0}")]
    UnknownWorkflowType(String),

    /// Failed to deserialize workflow input
    #[error("invalid workflow input: {0}")]
    Deserialization(#[source] serde_json::Error),
}

/// Registry mapping workflow type names to factories.
///
/// Built once at process start; lookups against a closed set of names.
#[derive(Default)]
pub struct WorkflowRegistry {
    factories: HashMap<String, WorkflowFactory>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a workflow type.
    pub fn register<W: Workflow>(&mut self) {
        let factory: WorkflowFactory = Box::new(|input: Value| {
            let typed_input: W::Input = serde_json::from_value(input)?;
            Ok(Box::new(WorkflowWrapper {
                inner: W::new(typed_input),
            }) as Box<dyn AnyWorkflow>)
        });

        self.factories.insert(W::TYPE.to_string(), factory);
    }

    pub fn contains(&self, workflow_type: &str) -> bool {
        self.factories.contains_key(workflow_type)
    }

    /// Create a workflow instance from its type name and JSON input.
    pub fn create(
        &self,
        workflow_type: &str,
        input: Value,
    ) -> Result<Box<dyn AnyWorkflow>, RegistryError> {
        let factory = self
            .factories
            .get(workflow_type)
            .ok_or_else(|| RegistryError::UnknownWorkflowType(workflow_type.to_string()))?;

        factory(input).map_err(RegistryError::Deserialization)
    }

    pub fn workflow_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|s| s.as_str())
    }
}

impl fmt::Debug for WorkflowRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowRegistry")
            .field("workflow_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Errors from engine execution
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Validation failure before execution (unknown name, malformed input)
    #[error("validation error: {0}")]
    Validation(#[from] RegistryError),

    /// The workflow reached a terminal failure
    #[error("workflow failed: {0}")]
    WorkflowFailed(WorkflowError),

    /// The workflow stopped emitting actions without reaching a terminal state
    #[error("workflow {0} stalled without reaching a terminal state")]
    Stalled(String),

    /// Serialization error at the typed wrapper boundary
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// The terminal error a parent observes from a failed child invocation.
    fn into_workflow_error(self) -> WorkflowError {
        match self {
            EngineError::WorkflowFailed(error) => error,
            other => WorkflowError::new(other.to_string()),
        }
    }
}

/// In-memory durable-execution engine.
///
/// Executes workflow invocations synchronously in-process: fast and
/// deterministic, but not durable across restarts. The capability surface
/// (registries, actions, retry semantics) matches what a durable backend
/// provides, so workflow code written against it does not change.
#[derive(Default)]
pub struct InMemoryEngine {
    workflows: WorkflowRegistry,
    activities: ActivityRegistry,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self {
            workflows: WorkflowRegistry::new(),
            activities: ActivityRegistry::new(),
        }
    }

    /// Register a workflow type.
    pub fn register_workflow<W: Workflow>(&mut self) {
        self.workflows.register::<W>();
        info!(workflow_type = W::TYPE, "registered workflow type");
    }

    /// Register an activity instance.
    pub fn register_activity<A: crate::activity::Activity>(&mut self, activity: A) {
        self.activities.register(activity);
        info!(activity_type = A::TYPE, "registered activity type");
    }

    /// Registered workflow type names.
    pub fn workflow_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.workflows.workflow_types().collect();
        types.sort_unstable();
        types
    }

    /// Validate a workflow name against the registry without executing.
    pub fn has_workflow(&self, workflow_type: &str) -> bool {
        self.workflows.contains(workflow_type)
    }

    /// Run a workflow invocation to a terminal state.
    ///
    /// Returns the workflow's result JSON, or the terminal error. There is no
    /// partial-result return path: a failure discards the invocation's
    /// accumulator along with the instance.
    pub async fn run(&self, workflow_type: &str, input: Value) -> Result<Value, EngineError> {
        let workflow_id = format!("{}-{}", workflow_type, Uuid::now_v7());
        self.drive(workflow_id, workflow_type.to_string(), input).await
    }

    /// Typed wrapper over [`run`](Self::run) for tests and embedding.
    pub async fn run_workflow<W: Workflow>(
        &self,
        input: W::Input,
    ) -> Result<W::Output, EngineError> {
        let input_json = serde_json::to_value(&input)?;
        let output_json = self.run(W::TYPE, input_json).await?;
        Ok(serde_json::from_value(output_json)?)
    }

    fn drive(
        &self,
        workflow_id: String,
        workflow_type: String,
        input: Value,
    ) -> BoxFuture<'_, Result<Value, EngineError>> {
        Box::pin(async move {
            let mut workflow = self.workflows.create(&workflow_type, input)?;

            info!(workflow_id = %workflow_id, workflow_type = %workflow_type, "workflow started");

            let mut queue: VecDeque<WorkflowAction> = workflow.on_start().into();

            while let Some(action) = queue.pop_front() {
                match action {
                    WorkflowAction::ScheduleActivity {
                        activity_id,
                        activity_type,
                        input,
                        options,
                    } => {
                        let outcome = self
                            .execute_activity(&workflow_id, &activity_id, &activity_type, input, &options)
                            .await;

                        let next = match outcome {
                            Ok(result) => workflow.on_activity_completed(&activity_id, result),
                            Err(error) => {
                                warn!(
                                    workflow_id = %workflow_id,
                                    activity_id = %activity_id,
                                    error = %error,
                                    "activity failed terminally"
                                );
                                workflow.on_activity_failed(&activity_id, &error)
                            }
                        };
                        queue.extend(next);
                    }

                    WorkflowAction::ScheduleChildWorkflow {
                        workflow_id: child_id,
                        workflow_type: child_type,
                        input,
                    } => {
                        debug!(
                            workflow_id = %workflow_id,
                            child_id = %child_id,
                            child_type = %child_type,
                            "starting child workflow"
                        );

                        let next = match self.drive(child_id.clone(), child_type, input).await {
                            Ok(result) => workflow.on_child_completed(&child_id, result),
                            Err(error) => {
                                let child_error = error.into_workflow_error();
                                warn!(
                                    workflow_id = %workflow_id,
                                    child_id = %child_id,
                                    error = %child_error,
                                    "child workflow failed"
                                );
                                workflow.on_child_failed(&child_id, &child_error)
                            }
                        };
                        queue.extend(next);
                    }

                    WorkflowAction::CompleteWorkflow { result } => {
                        info!(workflow_id = %workflow_id, "workflow completed");
                        return Ok(result);
                    }

                    WorkflowAction::FailWorkflow { error } => {
                        info!(workflow_id = %workflow_id, error = %error, "workflow failed");
                        return Err(EngineError::WorkflowFailed(error));
                    }

                    WorkflowAction::None => {}
                }
            }

            // The action queue drained without a terminal action; a correct
            // workflow always ends in CompleteWorkflow or FailWorkflow.
            Err(EngineError::Stalled(workflow_id))
        })
    }

    /// Execute one activity call under its retry policy and timeout.
    async fn execute_activity(
        &self,
        workflow_id: &str,
        activity_id: &str,
        activity_type: &str,
        input: Value,
        options: &ActivityOptions,
    ) -> Result<Value, ActivityError> {
        let activity = self.activities.get(activity_type).ok_or_else(|| {
            ActivityError::non_retryable(format!("unknown activity type: {}", activity_type))
                .with_type("UNKNOWN_ACTIVITY")
        })?;

        let policy = &options.retry_policy;
        let mut attempt: u32 = 1;

        loop {
            let ctx = ActivityContext::new(workflow_id, activity_id, attempt);

            let attempt_result = match tokio::time::timeout(
                options.start_to_close_timeout,
                activity.execute_json(&ctx, input.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ActivityError::retryable(format!(
                    "activity {} exceeded start-to-close timeout",
                    activity_id
                ))
                .with_type("TIMEOUT")),
            };

            match attempt_result {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !error.retryable || !policy.has_attempts_remaining(attempt) {
                        return Err(error);
                    }

                    let delay = policy.delay_for_attempt(attempt + 1);
                    warn!(
                        workflow_id = %workflow_id,
                        activity_id = %activity_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "activity attempt failed, retrying"
                    );

                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
