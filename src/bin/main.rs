use knowledge_agent::{
    classifier::IntentClassifier,
    config::AgentConfig,
    dispatch::Dispatcher,
    extract::SystemClock,
    handlers::create_registry,
    llm::OpenAiClient,
    providers::{DocsClient, FrankfurterClient, MockRates, PgStore, PineconeIndex},
};
use std::sync::Arc;
use tracing::info;

/// Route a few sample questions through the full agent and print the
/// aggregated answers. Needs the same environment as the API server.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    dotenv::dotenv().ok();
    let config = AgentConfig::from_env();

    let database_url = config
        .database_url
        .clone()
        .ok_or("DATABASE_URL (or POSTGRES_URL) must be set")?;
    let pinecone_host = config
        .pinecone_index_host
        .clone()
        .ok_or("PINECONE_INDEX_HOST must be set")?;
    let pinecone_key = config
        .pinecone_api_key
        .clone()
        .ok_or("PINECONE_API_KEY must be set")?;

    let openai = Arc::new(OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.openai_model.clone(),
    )?);
    let store = Arc::new(PgStore::connect_lazy(&database_url)?);
    let live_rates = Arc::new(FrankfurterClient::new(config.frankfurter_base_url.clone())?);
    let index = Arc::new(PineconeIndex::new(pinecone_host, pinecone_key)?);
    let docs = Arc::new(DocsClient::new(openai.clone(), openai.clone(), index));

    let registry = create_registry(
        openai.clone(),
        store.clone(),
        store,
        live_rates,
        Arc::new(MockRates::new()),
        docs,
        Arc::new(SystemClock),
    );
    let dispatcher = Dispatcher::new(IntentClassifier::new(openai), registry);

    info!("Multi-Source Knowledge Agent - CLI demo");

    let questions = [
        "What is the status of order 1?",
        "How long does shipping take?",
        "Show me order 3 status, revenue for January, and shipping policy",
    ];

    for question in questions {
        println!("\n=== {} ===", question);
        println!("{}", dispatcher.answer(question).await);
        println!("----");
    }

    Ok(())
}
