use knowledge_agent::{
    config::AgentConfig,
    llm::{Embedder, OpenAiClient},
    providers::docs::{chunk_text, PineconeIndex},
};
use std::path::PathBuf;
use tracing::info;

const CHUNK_SIZE: usize = 500;
const CHUNK_OVERLAP: usize = 50;

/// Ingest `knowledge_base/*.txt` into the vector index: load, chunk, embed,
/// upsert.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    dotenv::dotenv().ok();
    let config = AgentConfig::from_env();

    let pinecone_host = config
        .pinecone_index_host
        .clone()
        .ok_or("PINECONE_INDEX_HOST must be set")?;
    let pinecone_key = config
        .pinecone_api_key
        .clone()
        .ok_or("PINECONE_API_KEY must be set")?;

    let openai = OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.openai_model.clone(),
    )?;
    let index = PineconeIndex::new(pinecone_host, pinecone_key)?;

    let docs_path = std::env::var("KNOWLEDGE_BASE_DIR").unwrap_or_else(|_| "knowledge_base".into());
    let docs_path = PathBuf::from(docs_path);

    // Load and chunk every .txt document
    let mut chunks = Vec::new();
    for entry in std::fs::read_dir(&docs_path)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }

        info!("Loading {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        chunks.extend(chunk_text(&content, CHUNK_SIZE, CHUNK_OVERLAP));
    }

    if chunks.is_empty() {
        return Err(format!("No .txt documents found in {}", docs_path.display()).into());
    }

    // Embed and upsert
    let mut vectors = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let vector = openai.embed(chunk).await?;
        vectors.push((format!("doc-{}", i), vector, chunk.clone()));
    }

    let count = index.upsert(vectors).await?;
    println!("Ingested {} chunks into the vector index", count);

    Ok(())
}
