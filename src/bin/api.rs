use knowledge_agent::{
    api::{start_server, ApiState},
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = AgentConfig::from_env();

    if config.openai_api_key.is_empty() {
        eprintln!("OPENAI_API_KEY not set; classification and extraction will fail");
    }

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

    info!("Multi-Source Knowledge Agent - API server");
    info!("Port: {}", config.port);

    // Long-lived client handles, constructed once and shared read-only.
    let openai = Arc::new(OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.openai_model.clone(),
    )?);
    let store = Arc::new(PgStore::connect_lazy(&database_url)?);
    let live_rates = Arc::new(FrankfurterClient::new(config.frankfurter_base_url.clone())?);
    let mock_rates = Arc::new(MockRates::new());
    let index = Arc::new(PineconeIndex::new(pinecone_host, pinecone_key)?);
    let docs = Arc::new(DocsClient::new(openai.clone(), openai.clone(), index));

    let registry = create_registry(
        openai.clone(),
        store.clone(),
        store.clone(),
        live_rates,
        mock_rates.clone(),
        docs,
        Arc::new(SystemClock),
    );
    let classifier = IntentClassifier::new(openai);
    let dispatcher = Arc::new(Dispatcher::new(classifier, registry));

    let state = ApiState {
        dispatcher,
        orders: store.clone(),
        revenue: store,
        converter: mock_rates,
    };

    info!("Agent initialized, starting API server");

    start_server(state, config.port).await?;

    Ok(())
}
