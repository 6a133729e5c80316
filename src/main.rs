use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use karakeep_rss::cache::FeedCache;
use karakeep_rss::config::Config;
use karakeep_rss::fetcher::Fetcher;
use karakeep_rss::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may carry RUST_LOG, so it loads before logging is set up
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "karakeep_rss=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Publishing lists {:?} from {}",
        config.karakeep.list_names, config.karakeep.api_base
    );

    let fetcher = Fetcher::new(&config.karakeep)?;
    let cache = FeedCache::new(config.cache_ttl);
    let bind_addr = config.bind_addr.clone();

    let state = Arc::new(AppState {
        config,
        fetcher,
        cache,
    });

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
