use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{EngineError, Result};

use crate::LlmProvider;

/// Chat-completions client for any OpenAI-compatible endpoint.
///
/// The insight surface is optional: without an API key the client stays
/// constructible and reports the provider as unconfigured at call time.
pub struct ChatClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    http: Client,
}

impl ChatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            http: Client::builder()
                .use_rustls_tls()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl LlmProvider for ChatClient {
    async fn insight(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            return Err(EngineError::provider("LLM provider is not configured"));
        };

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens: 300,
            temperature: 0.4,
        };

        debug!(model = %self.model, "Requesting insight completion");
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::provider(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::provider(format!("LLM HTTP {status}: {text}")));
        }

        let completion: ChatResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::provider(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| EngineError::provider("LLM returned no completion"))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}
