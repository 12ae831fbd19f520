//! OpenAI API client for classification and extraction
//!
//! The LLM is treated as a black box behind the [`LanguageModel`] trait so
//! every caller (classifier, extractors, document QA) can be tested against
//! a scripted fake. Uses a long-lived reqwest::Client for connection pooling.

use crate::error::AgentError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Black-box text-completion capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one prompt, get the raw reply text back.
    async fn complete(&self, prompt: &str) -> crate::Result<String>;
}

/// Black-box text-embedding capability, used by the document QA provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> crate::Result<Vec<f32>>;
}

/// Reusable OpenAI client (connection-pooled)
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

const EMBEDDING_MODEL: &str = "text-embedding-3-small";

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String, model: String) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(AgentError::HttpError)?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, prompt: &str) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(AgentError::LlmError(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            temperature: 0.0,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        info!(model = %self.model, "Calling chat completion API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Chat completion request failed: {}", e);
                AgentError::LlmError(format!("Chat completion request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Chat completion error response: {}", error_text);
            return Err(AgentError::LlmError(format!(
                "Chat completion API error: {}",
                error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat completion response: {}", e);
            AgentError::LlmError(format!("Chat completion parse error: {}", e))
        })?;

        let answer = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AgentError::LlmError("Empty chat completion response".to_string()))?;

        Ok(answer)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        if self.api_key.is_empty() {
            return Err(AgentError::LlmError(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: EMBEDDING_MODEL.to_string(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::LlmError(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AgentError::LlmError(format!(
                "Embedding API error: {}",
                error_text
            )));
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AgentError::LlmError(format!("Embedding parse error: {}", e)))?;

        embedding_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AgentError::LlmError("Empty embedding response".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
