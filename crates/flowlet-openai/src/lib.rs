// OpenAI driver for flowlet
//
// Implements the LlmDriver trait from flowlet-core against the OpenAI
// chat-completions API. Non-streaming only: workflow activities need a
// single normalized string, not deltas.

mod driver;
mod types;

pub use driver::{OpenAiDriver, DEFAULT_MODEL};
