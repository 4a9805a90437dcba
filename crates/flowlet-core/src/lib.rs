// Shared building blocks for flowlet workflows.
//
// This crate is deliberately free of any engine or transport concern:
// everything here runs inside replay-sensitive workflow code or inside
// activities, so it must stay pure (template rendering, item access) or
// behind an explicit capability boundary (the LLM driver).

pub mod item;
pub mod llm;
pub mod template;

pub use item::LoopItem;
pub use llm::{LlmDriver, LlmError, LlmReply, ReplyPart, ScriptedDriver, ScriptedResponse};
pub use template::render;
