// OpenAI chat-completions driver.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use flowlet_core::{LlmDriver, LlmError, LlmReply, ReplyPart};

use crate::types::{ChatMessage, ChatRequest, ChatResponse};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model when the caller does not name one.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI LLM driver
pub struct OpenAiDriver {
    client: Client,
    api_key: String,
    default_model: String,
}

impl OpenAiDriver {
    /// Create a new driver; requires the OPENAI_API_KEY environment variable.
    pub fn new() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;
        Ok(Self::with_api_key(api_key))
    }

    /// Create a new driver with an explicit API key.
    pub fn with_api_key(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the model used when a request names none.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Model for one request: the caller's choice, else the driver default.
    fn model_for<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.default_model)
    }

    fn reply_from_content(content: Option<Value>) -> LlmReply {
        match content {
            Some(Value::String(text)) => LlmReply::Text(text),
            Some(Value::Array(parts)) => LlmReply::Parts(
                parts
                    .into_iter()
                    .map(|part| match part {
                        Value::String(text) => ReplyPart::Text(text),
                        // Structured parts carry their text under a "text" key.
                        Value::Object(ref obj) => match obj.get("text").and_then(Value::as_str) {
                            Some(text) => ReplyPart::Text(text.to_string()),
                            None => ReplyPart::Other(part),
                        },
                        other => ReplyPart::Other(other),
                    })
                    .collect(),
            ),
            Some(other) => LlmReply::Text(other.to_string()),
            None => LlmReply::Text(String::new()),
        }
    }
}

#[async_trait]
impl LlmDriver for OpenAiDriver {
    async fn send(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: Option<&str>,
    ) -> Result<LlmReply, LlmError> {
        let request = ChatRequest {
            model: self.model_for(model).to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
        };

        tracing::debug!(model = %request.model, "sending chat completion request");

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Request(format!(
                "OpenAI API request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("no choices in response".to_string()))?;

        Ok(Self::reply_from_content(choice.message.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_content_to_text_reply() {
        let reply = OpenAiDriver::reply_from_content(Some(json!("hello")));
        assert_eq!(reply.into_text(), "hello");
    }

    #[test]
    fn test_part_list_content_joined() {
        let reply = OpenAiDriver::reply_from_content(Some(json!([
            "plain",
            {"type": "text", "text": "structured"},
            {"type": "audio", "id": "a1"}
        ])));
        assert_eq!(
            reply.into_text(),
            "plain\nstructured\n{\"id\":\"a1\",\"type\":\"audio\"}"
        );
    }

    #[test]
    fn test_missing_content_is_empty() {
        let reply = OpenAiDriver::reply_from_content(None);
        assert_eq!(reply.into_text(), "");
    }

    #[test]
    fn test_non_string_scalar_content_stringified() {
        let reply = OpenAiDriver::reply_from_content(Some(json!(42)));
        assert_eq!(reply.into_text(), "42");
    }

    #[test]
    fn test_model_fallback_defaults_to_builtin() {
        let driver = OpenAiDriver::with_api_key("k".to_string());
        assert_eq!(driver.model_for(None), DEFAULT_MODEL);
        assert_eq!(driver.model_for(Some("gpt-4o")), "gpt-4o");
    }

    #[test]
    fn test_configured_default_model_reaches_requests() {
        let driver =
            OpenAiDriver::with_api_key("k".to_string()).with_default_model("gpt-4o-mini");
        assert_eq!(driver.model_for(None), "gpt-4o-mini");
        // An explicit request still wins over the configured default.
        assert_eq!(driver.model_for(Some("gpt-4o")), "gpt-4o");
    }
}
