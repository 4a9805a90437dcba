//! AI activities
//!
//! Two thin adapters over the LLM driver boundary: `ai_define_term` builds a
//! `Define: <name>` prompt, `ai_chat` passes the user text through. Both
//! share the failure-injection contract: an optional `fail_rate` probability
//! draws a uniform value per attempt and fails with a retryable
//! `SIMULATED_FAILURE` when the draw lands below the rate. That path exists
//! to exercise the engine's retry policy, not to model a real fault.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use flowlet_core::{LlmDriver, LlmError};
use flowlet_durable::{Activity, ActivityContext, ActivityError, ActivityOptions, RetryPolicy};

/// System message applied when the caller supplies none.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant";

/// Options for AI activity calls scheduled from the loop workflows:
/// 1 minute start-to-close, exponential retry from 3s with coefficient 2.
pub fn ai_activity_options() -> ActivityOptions {
    ActivityOptions::default()
        .with_start_to_close_timeout(Duration::from_secs(60))
        .with_retry(
            RetryPolicy::exponential()
                .with_initial_interval(Duration::from_secs(3))
                .with_backoff_coefficient(2.0),
        )
}

/// Draw the simulated-failure gate for this attempt.
fn inject_failure(fail_rate: Option<f64>) -> Result<(), ActivityError> {
    let rate = fail_rate.unwrap_or(0.0);
    if rate > 0.0 && rand::thread_rng().gen::<f64>() < rate {
        return Err(ActivityError::retryable("Simulated AI failure").with_type("SIMULATED_FAILURE"));
    }
    Ok(())
}

/// Provider errors are retryable under the same policy as simulated ones;
/// the adapter does not distinguish the two to the caller.
fn provider_failure(error: LlmError) -> ActivityError {
    ActivityError::retryable(error.to_string()).with_type("PROVIDER_FAILURE")
}

// ============================================================================
// ai_define_term
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDefineTermInput {
    pub name: String,
    #[serde(default)]
    pub system_message: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub fail_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiDefineTermOutput {
    pub name: String,
    pub definition: String,
}

/// Asks the model to define a term by name.
pub struct AiDefineTermActivity {
    driver: Arc<dyn LlmDriver>,
}

impl AiDefineTermActivity {
    pub fn new(driver: Arc<dyn LlmDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl Activity for AiDefineTermActivity {
    const TYPE: &'static str = "ai_define_term";
    type Input = AiDefineTermInput;
    type Output = AiDefineTermOutput;

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        inject_failure(input.fail_rate)?;

        let system_message = input
            .system_message
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_MESSAGE);
        let user_prompt = format!("Define: {}", input.name);

        debug!(
            activity_id = %ctx.activity_id,
            attempt = ctx.attempt,
            name = %input.name,
            "calling model for definition"
        );

        let reply = self
            .driver
            .send(system_message, &user_prompt, input.model.as_deref())
            .await
            .map_err(provider_failure)?;

        Ok(AiDefineTermOutput {
            name: input.name,
            definition: reply.into_text(),
        })
    }
}

// ============================================================================
// ai_chat
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiChatInput {
    #[serde(default)]
    pub system_message: Option<String>,
    pub user_text: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub fail_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiChatOutput {
    pub response: String,
}

/// Sends arbitrary user text through the model.
pub struct AiChatActivity {
    driver: Arc<dyn LlmDriver>,
}

impl AiChatActivity {
    pub fn new(driver: Arc<dyn LlmDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl Activity for AiChatActivity {
    const TYPE: &'static str = "ai_chat";
    type Input = AiChatInput;
    type Output = AiChatOutput;

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        inject_failure(input.fail_rate)?;

        let system_message = input
            .system_message
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_MESSAGE);

        debug!(
            activity_id = %ctx.activity_id,
            attempt = ctx.attempt,
            "calling model for chat"
        );

        let reply = self
            .driver
            .send(system_message, &input.user_text, input.model.as_deref())
            .await
            .map_err(provider_failure)?;

        Ok(AiChatOutput {
            response: reply.into_text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlet_core::{ScriptedDriver, ScriptedResponse};

    fn ctx() -> ActivityContext {
        ActivityContext::new("wf-test", "a-1", 1)
    }

    #[tokio::test]
    async fn test_define_term_prompt_and_output() {
        let driver = Arc::new(ScriptedDriver::fixed("a fermented grape beverage"));
        let activity = AiDefineTermActivity::new(driver.clone());

        let output = activity
            .execute(
                &ctx(),
                AiDefineTermInput {
                    name: "wine".to_string(),
                    system_message: None,
                    model: None,
                    fail_rate: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(output.name, "wine");
        assert_eq!(output.definition, "a fermented grape beverage");
        assert_eq!(driver.seen_prompts(), vec!["Define: wine".to_string()]);
    }

    #[tokio::test]
    async fn test_chat_passes_user_text_through() {
        let driver = Arc::new(ScriptedDriver::echo());
        let activity = AiChatActivity::new(driver.clone());

        let output = activity
            .execute(
                &ctx(),
                AiChatInput {
                    system_message: Some("custom persona".to_string()),
                    user_text: "hello there".to_string(),
                    model: None,
                    fail_rate: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(output.response, "hello there");
        assert_eq!(driver.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_rate_one_always_fails() {
        let driver = Arc::new(ScriptedDriver::fixed("unreachable"));
        let activity = AiChatActivity::new(driver.clone());

        for _ in 0..20 {
            let error = activity
                .execute(
                    &ctx(),
                    AiChatInput {
                        system_message: None,
                        user_text: "x".to_string(),
                        model: None,
                        fail_rate: Some(1.0),
                    },
                )
                .await
                .unwrap_err();

            assert!(error.retryable);
            assert_eq!(error.error_type.as_deref(), Some("SIMULATED_FAILURE"));
            assert_eq!(error.message, "Simulated AI failure");
        }

        // Injection fires before the provider call
        assert_eq!(driver.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_rate_zero_never_fires() {
        let driver = Arc::new(ScriptedDriver::fixed("ok"));
        let activity = AiChatActivity::new(driver.clone());

        for _ in 0..20 {
            let output = activity
                .execute(
                    &ctx(),
                    AiChatInput {
                        system_message: None,
                        user_text: "x".to_string(),
                        model: None,
                        fail_rate: Some(0.0),
                    },
                )
                .await
                .unwrap();
            assert_eq!(output.response, "ok");
        }

        assert_eq!(driver.call_count(), 20);
    }

    #[tokio::test]
    async fn test_provider_error_is_retryable() {
        let driver = Arc::new(ScriptedDriver::new(ScriptedResponse::Fail(
            "quota exceeded".to_string(),
        )));
        let activity = AiDefineTermActivity::new(driver);

        let error = activity
            .execute(
                &ctx(),
                AiDefineTermInput {
                    name: "term".to_string(),
                    system_message: None,
                    model: None,
                    fail_rate: None,
                },
            )
            .await
            .unwrap_err();

        assert!(error.retryable);
        assert_eq!(error.error_type.as_deref(), Some("PROVIDER_FAILURE"));
    }
}
