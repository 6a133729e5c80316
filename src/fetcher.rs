use std::collections::HashSet;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

use crate::config::KarakeepConfig;

/// Page size requested from the bookmarks endpoint.
pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct List {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: BookmarkContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookmarkContent {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub favicon: Option<String>,
    pub html_content: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListsResponse {
    #[serde(default)]
    lists: Vec<List>,
}

#[derive(Debug, Default, Deserialize)]
struct BookmarksPage {
    #[serde(default)]
    bookmarks: Vec<Bookmark>,
    #[serde(default, alias = "nextCursor")]
    cursor: Option<String>,
}

/// A timestamp that fails to parse is treated as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Client for the bookmarking service's REST API.
pub struct Fetcher {
    client: Client,
    api_base: String,
    api_key: String,
}

impl Fetcher {
    pub fn new(config: &KarakeepConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("KarakeepRss/1.0 (RSS Bridge)")
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetch every list visible to the configured token
    pub async fn lists(&self) -> Result<Vec<List>, reqwest::Error> {
        let url = format!("{}/api/v1/lists", self.api_base);
        debug!("Fetching lists from {}", url);

        let response: ListsResponse = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.lists)
    }

    async fn bookmarks_page(
        &self,
        list_id: &str,
        cursor: Option<&str>,
    ) -> Result<BookmarksPage, reqwest::Error> {
        let url = format!("{}/api/v1/lists/{}/bookmarks", self.api_base, list_id);
        let limit = PAGE_SIZE.to_string();

        let mut query = vec![("includeContent", "true"), ("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        self.client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Walk every page of a list, returning each bookmark once in first-seen order
    pub async fn fetch_all_bookmarks_for_list(
        &self,
        list_id: &str,
    ) -> Result<Vec<Bookmark>, reqwest::Error> {
        let mut bookmarks = Vec::new();
        let mut cursor: Option<String> = None;
        let mut sent_cursors = HashSet::new();
        let mut pages = 0;

        loop {
            let page = self.bookmarks_page(list_id, cursor.as_deref()).await?;
            pages += 1;
            debug!(
                "List {}: page {} returned {} bookmarks",
                list_id,
                pages,
                page.bookmarks.len()
            );

            if page.bookmarks.is_empty() {
                break;
            }
            bookmarks.extend(page.bookmarks);

            match page.cursor.filter(|next| !next.is_empty()) {
                Some(next) if !sent_cursors.insert(next.clone()) => {
                    warn!("List {}: upstream repeated cursor {}, stopping", list_id, next);
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let total = bookmarks.len();
        let bookmarks = dedupe_by_id(bookmarks);
        if bookmarks.len() < total {
            debug!(
                "List {}: dropped {} duplicate bookmarks across pages",
                list_id,
                total - bookmarks.len()
            );
        }

        info!(
            "Fetched {} bookmarks from list {} in {} pages",
            bookmarks.len(),
            list_id,
            pages
        );
        Ok(bookmarks)
    }

    /// Fetch each list in turn; a bookmark in two lists appears twice
    pub async fn fetch_all_bookmarks(
        &self,
        list_ids: &[String],
    ) -> Result<Vec<Bookmark>, reqwest::Error> {
        let mut all = Vec::new();
        for list_id in list_ids {
            all.extend(self.fetch_all_bookmarks_for_list(list_id).await?);
        }
        Ok(all)
    }
}

/// Keep the lists whose names appear in `configured_names`, ignoring case and
/// surrounding whitespace.
pub fn resolve_lists(all_lists: &[List], configured_names: &[String]) -> Vec<List> {
    let wanted: HashSet<String> = configured_names
        .iter()
        .map(|name| name.trim().to_lowercase())
        .collect();

    all_lists
        .iter()
        .filter(|list| wanted.contains(&list.name.trim().to_lowercase()))
        .cloned()
        .collect()
}

pub fn dedupe_by_id(bookmarks: Vec<Bookmark>) -> Vec<Bookmark> {
    let mut seen = HashSet::new();
    bookmarks
        .into_iter()
        .filter(|bookmark| seen.insert(bookmark.id.clone()))
        .collect()
}
