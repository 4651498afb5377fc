//! OpenAI-compatible chat completions generator.

use std::time::Duration;

use async_trait::async_trait;
use courseforge_shared::{CourseForgeError, GeneratorConfig, Result};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{GenerationRequest, TextGenerator, truncate_body};

const PROVIDER: &str = "openai";

/// Connection settings for [`OpenAiGenerator`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Transport-level timeout; the pipeline applies its own budget on top.
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn from_config(config: &GeneratorConfig, api_key: String, timeout: Duration) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Text generator backed by any `/chat/completions` endpoint.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CourseForgeError::transport(PROVIDER, e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    #[instrument(skip_all, fields(model = %self.config.model, max_tokens = request.max_tokens))]
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| CourseForgeError::transport(PROVIDER, e.to_string()))?,
        );

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| CourseForgeError::transport(PROVIDER, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CourseForgeError::transport(
                PROVIDER,
                format!("HTTP {status}: {}", truncate_body(&text)),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CourseForgeError::transport(PROVIDER, format!("bad response body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CourseForgeError::transport(PROVIDER, "response had no message content"))?;

        debug!(chars = content.len(), "generation complete");
        Ok(content)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
