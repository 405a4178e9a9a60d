//! Chat-completion client
//!
//! The comparison service talks to the provider through [`ChatCompletion`]
//! so tests can substitute a canned answer.

use crate::config::AiConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Send the conversation and return the first choice's text
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// OpenAI-compatible `/chat/completions` client
pub struct OpenAiChatClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiChatClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let api_key = config
            .api_key()
            .ok_or_else(|| anyhow!("AI API key is not configured"))?
            .to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Client for the configured provider, or `None` without an API key
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>> {
        if config.api_key().is_none() {
            return Ok(None);
        }
        Self::new(config).map(Some)
    }
}

#[async_trait]
impl ChatCompletion for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        #[derive(Serialize)]
        struct CompletionRequest<'a> {
            model: &'a str,
            messages: &'a [ChatMessage],
            max_tokens: u32,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct CompletionResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ResponseMessage,
        }

        #[derive(Deserialize)]
        struct ResponseMessage {
            #[serde(default)]
            content: Option<String>,
        }

        tracing::info!("Requesting chat completion from {} ({})", self.endpoint, self.model);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            })
            .send()
            .await
            .context("Chat completion request failed")?
            .error_for_status()
            .context("Chat completion provider returned an error")?
            .json::<CompletionResponse>()
            .await
            .context("Malformed chat completion response")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Chat completion returned no content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct StubProvider {
        status: StatusCode,
        reply: Value,
        seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn stub_completions(
        State(stub): State<StubProvider>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        stub.seen.lock().unwrap().push((auth, body));
        (stub.status, Json(stub.reply.clone()))
    }

    /// Serve a canned provider reply on a local port; returns the client and captured requests
    async fn stub_client(
        status: StatusCode,
        reply: Value,
    ) -> (OpenAiChatClient, Arc<Mutex<Vec<(Option<String>, Value)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/v1/chat/completions", post(stub_completions))
            .with_state(StubProvider { status, reply, seen: seen.clone() });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = AiConfig {
            api_key: Some("sk-stub".to_string()),
            base_url: format!("http://{}/v1", addr),
            model: "stub-model".to_string(),
            max_tokens: 321,
            temperature: 0.5,
            ..AiConfig::default()
        };
        (OpenAiChatClient::new(&config).unwrap(), seen)
    }

    #[tokio::test]
    async fn test_complete_sends_request_and_takes_first_choice() {
        let reply = json!({"choices": [
            {"message": {"role": "assistant", "content": "첫 번째"}},
            {"message": {"role": "assistant", "content": "두 번째"}}
        ]});
        let (client, seen) = stub_client(StatusCode::OK, reply).await;

        let answer = client
            .complete(&[ChatMessage::system("규칙"), ChatMessage::user("비교해줘")])
            .await
            .unwrap();
        assert_eq!(answer, "첫 번째");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-stub"));
        assert_eq!(
            body,
            &json!({
                "model": "stub-model",
                "messages": [
                    {"role": "system", "content": "규칙"},
                    {"role": "user", "content": "비교해줘"}
                ],
                "max_tokens": 321,
                "temperature": 0.5
            })
        );
    }

    #[tokio::test]
    async fn test_complete_fails_on_provider_error_status() {
        let (client, _) =
            stub_client(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": {"message": "boom"}})).await;

        let err = client.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(err.to_string().contains("provider returned an error"));
    }

    #[tokio::test]
    async fn test_complete_fails_without_choices() {
        let (client, _) = stub_client(StatusCode::OK, json!({"choices": []})).await;

        let err = client.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert_eq!(err.to_string(), "Chat completion returned no content");
    }

    #[test]
    fn test_from_config_without_key() {
        let config = AiConfig {
            api_key: Some("   ".to_string()),
            ..AiConfig::default()
        };
        assert!(OpenAiChatClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = AiConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "http://localhost:9999/v1/".to_string(),
            ..AiConfig::default()
        };
        let client = OpenAiChatClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "http://localhost:9999/v1/chat/completions");
        assert_eq!(client.model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_value(ChatMessage::system("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "hi"}));
    }
}
