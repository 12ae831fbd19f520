//! Document QA provider
//!
//! Retrieval-augmented answering over the ingested knowledge base: embed the
//! question, pull the closest chunks from the vector index, and ask the LLM
//! to answer from that context only.

use crate::error::AgentError;
use crate::llm::{Embedder, LanguageModel};
use crate::providers::DocsProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const TOP_K: usize = 3;

/// Nearest-neighbor lookup over ingested knowledge chunks.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return the chunk text of the `top_k` closest vectors.
    async fn query(&self, vector: Vec<f32>, top_k: usize) -> crate::Result<Vec<String>>;
}

/// REST client for a Pinecone serverless index.
pub struct PineconeIndex {
    client: Client,
    host: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct QueryRequest {
    vector: Vec<f32>,
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    metadata: Option<ChunkMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChunkMetadata {
    text: String,
}

impl PineconeIndex {
    pub fn new(host: String, api_key: String) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(AgentError::HttpError)?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Upsert (id, vector, chunk text) triples. Used by ingestion.
    pub async fn upsert(&self, chunks: Vec<(String, Vec<f32>, String)>) -> crate::Result<usize> {
        let url = format!("{}/vectors/upsert", self.host);
        let count = chunks.len();

        let vectors: Vec<serde_json::Value> = chunks
            .into_iter()
            .map(|(id, values, text)| {
                json!({
                    "id": id,
                    "values": values,
                    "metadata": { "text": text },
                })
            })
            .collect();

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&json!({ "vectors": vectors }))
            .send()
            .await
            .map_err(|e| AgentError::ProviderError(format!("Vector upsert failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AgentError::ProviderError(format!(
                "Vector index returned {} on upsert",
                response.status()
            )));
        }

        info!(count, "Upserted knowledge chunks");
        Ok(count)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, vector: Vec<f32>, top_k: usize) -> crate::Result<Vec<String>> {
        let url = format!("{}/query", self.host);

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
        };

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::ProviderError(format!("Vector query failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AgentError::ProviderError(format!(
                "Vector index returned {}",
                response.status()
            )));
        }

        let parsed: QueryResponse = response.json().await.map_err(|e| {
            AgentError::ProviderError(format!("Invalid vector query response: {}", e))
        })?;

        Ok(parsed
            .matches
            .into_iter()
            .filter_map(|m| m.metadata.map(|meta| meta.text))
            .collect())
    }
}

/// Embed → retrieve → answer, with the answer constrained to the retrieved
/// context.
pub struct DocsClient {
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LanguageModel>,
    index: Arc<dyn VectorIndex>,
}

impl DocsClient {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            embedder,
            llm,
            index,
        }
    }
}

#[async_trait]
impl DocsProvider for DocsClient {
    async fn ask(&self, question: &str) -> crate::Result<String> {
        let vector = self.embedder.embed(question).await?;
        let chunks = self.index.query(vector, TOP_K).await?;

        debug!(retrieved = chunks.len(), "Knowledge base retrieval");

        let context = chunks.join("\n\n");
        let prompt = format!(
            r#"Answer the question using ONLY the context below.
If the answer is not in the context, say "I don't know".

Context:
{}

Question:
{}"#,
            context, question
        );

        self.llm.complete(&prompt).await
    }
}

/// Split text into overlapping chunks for ingestion. Boundaries are plain
/// character offsets; `overlap` must be smaller than `size`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    assert!(overlap < size, "chunk overlap must be smaller than chunk size");

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }

    chunks
}
