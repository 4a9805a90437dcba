// Wire types for the OpenAI chat-completions API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    /// Plain string for standard completions; some gateway deployments
    /// return structured part lists here, so accept any JSON shape.
    pub content: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a helpful assistant".to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: "Define: widget".to_string(),
                },
            ],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "Define: widget");
    }

    #[test]
    fn test_response_with_string_content() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "a widget is..."}}]
        }))
        .unwrap();

        assert_eq!(
            response.choices[0].message.content,
            Some(json!("a widget is..."))
        );
    }

    #[test]
    fn test_response_with_missing_content() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant"}}]
        }))
        .unwrap();

        assert_eq!(response.choices[0].message.content, None);
    }
}
