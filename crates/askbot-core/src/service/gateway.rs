use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::channel::telegram::{TelegramApi, TelegramChannel};
use crate::channel::{Channel, Messenger};
use crate::config::{Config, StorageBackend, StorageConfig};
use crate::error::ConfigError;
use crate::handler::HandlerContext;
use crate::provider::gemini::GeminiProvider;
use crate::provider::LlmProvider;
use crate::router::Router;
use crate::search::serpapi::SerpApiSearch;
use crate::search::WebSearch;
use crate::store::memory::MemoryStore;
use crate::store::Store;

/// Capacity of the queue between the poller and the router.
const EVENT_BUFFER: usize = 256;

/// Build the configured store. Connection problems are logged, never fatal;
/// writes keep failing until the database is reachable.
pub async fn build_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match StorageBackend::parse(&config.backend)? {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::MongoDb => mongo_store(config)?,
    };

    match store.ping().await {
        Ok(()) => info!("Connected to {} store", store.name()),
        Err(e) => error!("{} connection failed: {}", store.name(), e),
    }
    Ok(store)
}

#[cfg(feature = "mongodb-backend")]
fn mongo_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn Store>> {
    use crate::store::mongo::MongoStore;

    Ok(Arc::new(MongoStore::new(
        config.mongodb_uri.as_str(),
        config.database.as_str(),
    )))
}

#[cfg(not(feature = "mongodb-backend"))]
fn mongo_store(_config: &StorageConfig) -> anyhow::Result<Arc<dyn Store>> {
    anyhow::bail!("MongoDB support not compiled in; set storage.backend to \"memory\"")
}

/// Wire every collaborator from config into a handler context.
pub async fn build_context(config: &Config) -> anyhow::Result<HandlerContext> {
    let store = build_store(&config.storage).await?;

    let llm: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::from_config(&config.providers.gemini));
    let search = WebSearch::new(
        Arc::new(SerpApiSearch::from_config(&config.tools.web_search)),
        llm.clone(),
        config.tools.web_search.max_links,
    );
    let messenger: Arc<dyn Messenger> = Arc::new(TelegramApi::from_config(&config.channels.telegram));

    Ok(HandlerContext::new(store, llm, search, messenger))
}

/// Start the bot: poll Telegram and route events until shutdown.
pub async fn run_gateway(config: Config) -> anyhow::Result<()> {
    if config.channels.telegram.token.is_empty() {
        return Err(ConfigError::MissingCredential("TELEGRAM_BOT_TOKEN").into());
    }
    for missing in config.missing_credentials() {
        warn!("{} is not set; the handlers that need it will fail", missing);
    }

    let ctx = build_context(&config).await?;
    info!("Using model {}", ctx.llm.default_model());
    let router = Router::new(ctx);

    let (inbound_tx, inbound_rx) = mpsc::channel(EVENT_BUFFER);

    if config.channels.telegram.enabled {
        info!("Telegram channel enabled");
        let mut channel = TelegramChannel::new(config.channels.telegram.clone(), inbound_tx);
        tokio::spawn(async move {
            if let Err(e) = channel.start().await {
                error!("Channel {} error: {}", channel.name(), e);
            }
        });
    } else {
        warn!("No channels enabled");
        drop(inbound_tx);
    }

    info!("askbot gateway started");

    tokio::select! {
        _ = router.run(inbound_rx) => {},
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
