//! Turns bookmarks into RSS 2.0 items and serializes the channel.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};

use crate::config::FeedConfig;
use crate::fetcher::Bookmark;
use crate::sanitize::{
    clean_entities, clean_mojibake, extract_first_image, normalize_text,
    remove_duplicate_images, strip_readability_wrapper,
};

const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";

/// Newest first, undated bookmarks last, then cut to `limit`.
pub fn select_recent(mut bookmarks: Vec<Bookmark>, limit: usize) -> Vec<Bookmark> {
    bookmarks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookmarks.truncate(limit);
    bookmarks
}

/// Preview image markup: first image in the article body, else the bookmark's
/// cover image, else nothing.
pub fn preview_image(core_html: &str, image_url: Option<&str>) -> String {
    if let Some(img) = extract_first_image(core_html) {
        return img.to_string();
    }

    match image_url.filter(|url| !url.is_empty()) {
        Some(url) => format!(
            r#"<img src="{}" alt="preview image" style="max-width:100%; margin: 1em 0;" />"#,
            encode_double_quoted_attribute(url)
        ),
        None => String::new(),
    }
}

fn content_block(title: &str, favicon: Option<&str>, body: &str) -> String {
    let icon = favicon
        .filter(|url| !url.is_empty())
        .map(|url| {
            format!(
                r#"<img src="{}" alt="favicon" width="16" height="16" style="margin-right:4px;vertical-align:middle;" /> "#,
                encode_double_quoted_attribute(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div style="font-family: sans-serif; line-height: 1.6; font-size: 15px;">
<h1>{}{}</h1>
{}
</div>"#,
        icon,
        encode_text(title),
        body
    )
}

pub fn build_item(bookmark: &Bookmark, now: DateTime<Utc>) -> Item {
    let content = &bookmark.content;

    let raw_title = content
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .or(content.url.as_deref().filter(|u| !u.is_empty()))
        .unwrap_or("Untitled");
    let title = normalize_text(raw_title);

    let core_html = strip_readability_wrapper(content.html_content.as_deref().unwrap_or(""));
    let cleaned_html = clean_mojibake(&clean_entities(&remove_duplicate_images(&core_html)));
    let preview = preview_image(&core_html, content.image_url.as_deref());

    let link = content
        .url
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "#".to_string());
    let date = bookmark.created_at.unwrap_or(now);

    let guid = GuidBuilder::default()
        .value(bookmark.id.clone())
        .permalink(false)
        .build();

    ItemBuilder::default()
        .title(Some(title.clone()))
        .link(Some(link))
        .guid(Some(guid))
        .pub_date(Some(date.to_rfc2822()))
        .description(Some(preview))
        .content(Some(content_block(
            &title,
            content.favicon.as_deref(),
            &cleaned_html,
        )))
        .build()
}

pub fn build_channel(settings: &FeedConfig, bookmarks: Vec<Bookmark>) -> Channel {
    let now = Utc::now();
    let items: Vec<Item> = select_recent(bookmarks, settings.limit)
        .iter()
        .map(|bookmark| build_item(bookmark, now))
        .collect();

    let mut namespaces = BTreeMap::new();
    namespaces.insert("content".to_string(), CONTENT_NAMESPACE.to_string());

    ChannelBuilder::default()
        .title(settings.title.clone())
        .link(settings.link.clone())
        .description(settings.description.clone())
        .language(Some(settings.language.clone()))
        .copyright(Some(settings.copyright.clone()))
        .managing_editor(Some(settings.author.clone()))
        .last_build_date(Some(now.to_rfc2822()))
        .generator(Some("karakeep-rss".to_string()))
        .namespaces(namespaces)
        .items(items)
        .build()
}

/// Render the full RSS document for `bookmarks`
pub fn render_feed(settings: &FeedConfig, bookmarks: Vec<Bookmark>) -> String {
    build_channel(settings, bookmarks).to_string()
}
