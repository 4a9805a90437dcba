//! Worker configuration from environment variables

use std::env;

/// Default work queue the flows are routed through.
pub const DEFAULT_TASK_QUEUE: &str = "n8n-queue";

/// Default model used when neither the caller nor the workflow supplies one.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Worker configuration.
///
/// All values have defaults, so `from_env()` never fails.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Named work queue invocations are routed through. Routing belongs to
    /// the external dispatch surface; the in-memory engine only logs it.
    pub task_queue: String,

    /// Fallback model applied by the provider driver when a workflow names
    /// none (see `OpenAiDriver::with_default_model`)
    pub default_model: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            task_queue: DEFAULT_TASK_QUEUE.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// - `FLOWLET_TASK_QUEUE` - work queue name (default: `n8n-queue`)
    /// - `FLOWLET_DEFAULT_MODEL` - fallback model (default: `gpt-3.5-turbo`)
    pub fn from_env() -> Self {
        Self {
            task_queue: env::var("FLOWLET_TASK_QUEUE")
                .unwrap_or_else(|_| DEFAULT_TASK_QUEUE.to_string()),
            default_model: env::var("FLOWLET_DEFAULT_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }
}
