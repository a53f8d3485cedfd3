use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use article_feed::config::Config;
use article_feed::db::{ArticleStore, SqliteStore};
use article_feed::memory::MemoryStore;
use article_feed::routes::{self, AppState};

const CONFIG_PATH: &str = "feed.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal outside development
    let _ = dotenv::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "article_feed=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = if std::path::Path::new(CONFIG_PATH).exists() {
        Config::load(CONFIG_PATH)?
    } else {
        info!("No {} found, using defaults", CONFIG_PATH);
        Config::default()
    };
    let config = config.with_env(|key| std::env::var(key).ok());
    config.validate()?;

    if config.api_key.is_none() {
        warn!("ADD_ARTICLE_API_KEY is not set; every add-article request will be rejected");
    }

    // Initialize the article store once; both handlers share it
    let store: Arc<dyn ArticleStore> = if config.database_url == "memory" {
        info!("Using in-memory article store");
        Arc::new(MemoryStore::new())
    } else {
        let db = SqliteStore::new(&config.database_url).await?;
        db.initialize().await?;
        info!("Database initialized");
        Arc::new(db)
    };

    let state = Arc::new(AppState {
        store,
        api_key: config.api_key.clone(),
        feed: config.feed.clone(),
    });

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(
        "Server starting on http://{} (feed at {})",
        config.bind_address, config.feed.path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
