//! Activity trait, errors, and the type-erased activity registry

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Error type for activity failures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityError {
    /// Error message
    pub message: String,

    /// Error type/code for programmatic handling
    /// (e.g. `SIMULATED_FAILURE`, `PROVIDER_FAILURE`)
    pub error_type: Option<String>,

    /// Whether this error is retryable
    ///
    /// Non-retryable errors fail the activity immediately without further
    /// attempts.
    pub retryable: bool,
}

impl ActivityError {
    /// Create a new retryable error
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            retryable: true,
        }
    }

    /// Create a non-retryable error
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            retryable: false,
        }
    }

    /// Set the error type
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }
}

impl fmt::Display for ActivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActivityError {}

/// Execution context passed to every activity attempt.
#[derive(Debug, Clone)]
pub struct ActivityContext {
    /// Identifier of the enclosing workflow invocation
    pub workflow_id: String,

    /// Identifier of this activity call within the workflow
    pub activity_id: String,

    /// Attempt number, 1-based
    pub attempt: u32,
}

impl ActivityContext {
    pub fn new(workflow_id: impl Into<String>, activity_id: impl Into<String>, attempt: u32) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            activity_id: activity_id.into(),
            attempt,
        }
    }
}

/// An activity is a single external, side-effecting call invoked from
/// workflow code, individually retriable.
///
/// # Errors
///
/// Return [`ActivityError::retryable`] for transient failures that should be
/// retried under the call's policy, [`ActivityError::non_retryable`] for
/// permanent ones.
#[async_trait]
pub trait Activity: Send + Sync + 'static {
    /// Unique type identifier, used to look up the activity in the registry
    const TYPE: &'static str;

    /// Input type for the activity
    type Input: Serialize + DeserializeOwned + Send;

    /// Output type for the activity
    type Output: Serialize + DeserializeOwned + Send;

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError>;
}

/// Type-erased activity interface: JSON in, JSON out.
#[async_trait]
pub trait AnyActivity: Send + Sync {
    fn activity_type(&self) -> &'static str;

    async fn execute_json(
        &self,
        ctx: &ActivityContext,
        input: Value,
    ) -> Result<Value, ActivityError>;
}

struct ActivityWrapper<A: Activity> {
    inner: A,
}

#[async_trait]
impl<A: Activity> AnyActivity for ActivityWrapper<A> {
    fn activity_type(&self) -> &'static str {
        A::TYPE
    }

    async fn execute_json(
        &self,
        ctx: &ActivityContext,
        input: Value,
    ) -> Result<Value, ActivityError> {
        let typed_input: A::Input = serde_json::from_value(input).map_err(|e| {
            ActivityError::non_retryable(format!("invalid {} input: {}", A::TYPE, e))
                .with_type("INVALID_INPUT")
        })?;

        let output = self.inner.execute(ctx, typed_input).await?;

        serde_json::to_value(output).map_err(|e| {
            ActivityError::non_retryable(format!("failed to serialize {} output: {}", A::TYPE, e))
        })
    }
}

/// Registry of activity instances.
///
/// Activities are registered as instances (they carry their own handles,
/// e.g. the LLM driver) keyed by their type name.
#[derive(Default)]
pub struct ActivityRegistry {
    activities: HashMap<String, Arc<dyn AnyActivity>>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self {
            activities: HashMap::new(),
        }
    }

    /// Register an activity instance under its type name.
    pub fn register<A: Activity>(&mut self, activity: A) {
        self.activities
            .insert(A::TYPE.to_string(), Arc::new(ActivityWrapper { inner: activity }));
    }

    /// Look up an activity by type name.
    pub fn get(&self, activity_type: &str) -> Option<Arc<dyn AnyActivity>> {
        self.activities.get(activity_type).cloned()
    }

    pub fn contains(&self, activity_type: &str) -> bool {
        self.activities.contains_key(activity_type)
    }

    pub fn activity_types(&self) -> impl Iterator<Item = &str> {
        self.activities.keys().map(|s| s.as_str())
    }
}

impl fmt::Debug for ActivityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityRegistry")
            .field("activity_types", &self.activities.keys().collect::<Vec<_>>())
            .finish()
    }
}
