//! Environment-driven configuration
//!
//! All external endpoints and credentials come from the environment.
//! Binaries call `dotenv::dotenv().ok()` before reading this.

use std::env;

/// Configuration for every external collaborator the agent talks to.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// OpenAI API key (chat completions + embeddings)
    pub openai_api_key: String,
    /// OpenAI-compatible base URL, e.g. `https://api.openai.com/v1`
    pub openai_base_url: String,
    /// Chat model used for classification and extraction
    pub openai_model: String,
    /// Postgres connection string for the orders/payments store
    pub database_url: Option<String>,
    /// Pinecone index host, e.g. `https://my-index-abc123.svc.pinecone.io`
    pub pinecone_index_host: Option<String>,
    /// Pinecone API key
    pub pinecone_api_key: Option<String>,
    /// Base URL of the live exchange-rate API
    pub frankfurter_base_url: String,
    /// HTTP listen port for the API server
    pub port: u16,
}

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_FRANKFURTER_BASE_URL: &str = "https://api.frankfurter.app";

impl AgentConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .or_else(|_| env::var("API_PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        Self {
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
            database_url: env::var("DATABASE_URL")
                .or_else(|_| env::var("POSTGRES_URL"))
                .ok(),
            pinecone_index_host: env::var("PINECONE_INDEX_HOST").ok(),
            pinecone_api_key: env::var("PINECONE_API_KEY").ok(),
            frankfurter_base_url: env::var("FRANKFURTER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_FRANKFURTER_BASE_URL.to_string()),
            port,
        }
    }
}
