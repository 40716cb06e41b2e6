// rag_playground/src/llm.rs
// Chat completion client.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OpenAISettings;
use crate::error::{PlaygroundError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
pub struct ChatMessage {
    pub role:    String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String,>,) -> Self {
        Self {
            role:    "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String,>,) -> Self {
        Self {
            role:    "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage],) -> Result<String,>;

    /// Completes in JSON mode and parses the reply.
    async fn complete_json(&self, messages: &[ChatMessage],) -> Result<serde_json::Value,>;
}

pub struct OpenAIChat {
    client:      Client,
    api_key:     SecretString,
    base_url:    String,
    model:       String,
    temperature: f32,
}

impl OpenAIChat {
    pub fn new(settings: &OpenAISettings,) -> Self {
        Self {
            client:      Client::new(),
            api_key:     settings.api_key.clone(),
            base_url:    settings.base_url.trim_end_matches('/',).to_string(),
            model:       settings.chat_model.clone(),
            temperature: 0.0,
        }
    }

    pub fn model(&self,) -> &str {
        &self.model
    }

    async fn send(&self, messages: &[ChatMessage], json_mode: bool,) -> Result<String,> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages,
            response_format: json_mode.then_some(ResponseFormat { kind: "json_object", },),
        };

        debug!("Sending {} messages to {}", messages.len(), self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url),)
            .bearer_auth(self.api_key.expose_secret(),)
            .json(&request,)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlaygroundError::ApiError { status, body, },);
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content,)
            .ok_or_else(|| PlaygroundError::Other("chat completion returned no content".to_string(),),)
    }
}

#[derive(Serialize,)]
struct ChatRequest<'a,> {
    model:           &'a str,
    temperature:     f32,
    messages:        &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat,>,
}

#[derive(Serialize,)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize,)]
struct ChatResponse {
    choices: Vec<ChatChoice,>,
}

#[derive(Deserialize,)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize,)]
struct AssistantMessage {
    content: Option<String,>,
}

#[async_trait]
impl ChatModel for OpenAIChat {
    async fn complete(&self, messages: &[ChatMessage],) -> Result<String,> {
        self.send(messages, false,).await
    }

    async fn complete_json(&self, messages: &[ChatMessage],) -> Result<serde_json::Value,> {
        let content = self.send(messages, true,).await?;
        parse_json_reply(&content,)
    }
}

/// Parses a model reply as JSON, tolerating a surrounding Markdown fence.
pub fn parse_json_reply(content: &str,) -> Result<serde_json::Value,> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json",)
        .or_else(|| trimmed.strip_prefix("```",),)
        .and_then(|rest| rest.trim_end().strip_suffix("```",),)
        .unwrap_or(trimmed,);

    serde_json::from_str(unfenced.trim(),)
        .map_err(|e| PlaygroundError::ExtractionError(format!("model reply is not valid JSON: {}", e),),)
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn chat(base_url: String,) -> OpenAIChat {
        OpenAIChat::new(&OpenAISettings {
            api_key: SecretString::new("sk-test".to_string(),),
            base_url,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        },)
    }

    #[test]
    fn fenced_json_is_accepted() {
        let value = parse_json_reply("```json\n{\"companies\": []}\n```",).unwrap();
        assert_eq!(value, json!({"companies": []}));
        assert!(parse_json_reply("not json",).is_err());
    }

    #[tokio::test]
    async fn complete_sends_zero_temperature_and_returns_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions",)
            .match_header("authorization", "Bearer sk-test",)
            .match_body(Matcher::PartialJson(json!({"model": "gpt-4o-mini", "temperature": 0.0}),),)
            .with_status(200,)
            .with_header("content-type", "application/json",)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Contact HR."}}]}"#,)
            .create_async()
            .await;

        let answer = chat(server.url(),)
            .complete(&[ChatMessage::user("Who do I contact?",)],)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(answer, "Contact HR.");
    }

    #[tokio::test]
    async fn complete_json_requests_json_mode() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions",)
            .match_body(Matcher::PartialJson(json!({"response_format": {"type": "json_object"}}),),)
            .with_status(200,)
            .with_header("content-type", "application/json",)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"{\"companies\":[]}"}}]}"#,)
            .create_async()
            .await;

        let value = chat(server.url(),)
            .complete_json(&[ChatMessage::user("extract",)],)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(value, json!({"companies": []}));
    }

    #[tokio::test]
    async fn server_errors_are_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions",)
            .with_status(500,)
            .with_body("upstream failure",)
            .create_async()
            .await;

        let err = chat(server.url(),).complete(&[ChatMessage::user("hi",)],).await.unwrap_err();
        assert!(matches!(err, PlaygroundError::ApiError { status: 500, .. }));
    }
}
