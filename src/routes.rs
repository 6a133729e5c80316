use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cache::FeedCache;
use crate::config::Config;
use crate::error::AppError;
use crate::feed::render_feed;
use crate::fetcher::{resolve_lists, Fetcher};

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

pub struct AppState {
    pub config: Config,
    pub fetcher: Fetcher,
    pub cache: FeedCache,
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub description: String,
    pub list_names: Vec<String>,
    pub cache_ttl_secs: u64,
    pub cached_age_secs: Option<u64>,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/rss", get(rss_feed))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Fetch every configured list and render a fresh document, bypassing the cache
pub async fn refresh_feed(state: &AppState) -> Result<String, AppError> {
    let names = &state.config.karakeep.list_names;

    let all_lists = state.fetcher.lists().await?;
    let lists = resolve_lists(&all_lists, names);
    if lists.is_empty() {
        let wanted = names
            .iter()
            .map(|name| format!("\"{}\"", name))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(AppError::ListNotFound(wanted));
    }

    let list_ids: Vec<String> = lists.iter().map(|list| list.id.clone()).collect();
    let bookmarks = state.fetcher.fetch_all_bookmarks(&list_ids).await?;
    info!(
        "Rendering feed from {} bookmarks across {} lists",
        bookmarks.len(),
        list_ids.len()
    );

    Ok(render_feed(&state.config.feed, bookmarks))
}

// Route handlers
pub async fn rss_feed(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let document = match state.cache.get().await {
        Some(document) => document,
        None => {
            info!("Feed cache miss, refreshing from upstream");
            let document = refresh_feed(&state).await?;
            state.cache.store(document.clone()).await;
            document
        }
    };

    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], document).into_response())
}

pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cached_age_secs = state.cache.age().await.map(|age| age.as_secs());

    HtmlTemplate(IndexTemplate {
        title: state.config.feed.title.clone(),
        description: state.config.feed.description.clone(),
        list_names: state.config.karakeep.list_names.clone(),
        cache_ttl_secs: state.cache.ttl().as_secs(),
        cached_age_secs,
    })
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
