use std::time::Duration;

use chrono::{Datelike, Utc};
use thiserror::Error;

/// Upper bound on items per feed, matching the upstream page size.
pub const MAX_BOOKMARKS: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub karakeep: KarakeepConfig,
    pub feed: FeedConfig,
    /// How long a rendered feed is served before the next request refreshes it
    pub cache_ttl: Duration,
    pub bind_addr: String,
}

#[derive(Debug, Clone)]
pub struct KarakeepConfig {
    pub api_base: String,
    pub api_key: String,
    /// Names of the lists to publish, matched case-insensitively
    pub list_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub title: String,
    pub description: String,
    pub link: String,
    pub language: String,
    pub author: String,
    pub copyright: String,
    /// Number of most recent bookmarks to publish, at most [`MAX_BOOKMARKS`]
    pub limit: usize,
}

fn default_list_names() -> Vec<String> {
    vec!["Great Articles".to_string()]
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(600)
}

fn default_copyright(author: &str) -> String {
    format!("{} {}", Utc::now().year(), author)
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (useful for testing)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let list_names = get("KARAKEEP_LIST_NAMES")
            .map(|raw| parse_list_names(&raw))
            .filter(|names| !names.is_empty())
            .unwrap_or_else(default_list_names);

        let author = get("FEED_AUTHOR").unwrap_or_else(|| "You".to_string());

        let limit = match get("BOOKMARK_LIMIT") {
            Some(raw) => parse_number::<usize>("BOOKMARK_LIMIT", &raw)?.clamp(1, MAX_BOOKMARKS),
            None => MAX_BOOKMARKS,
        };

        let cache_ttl = match get("CACHE_TTL_SECONDS") {
            Some(raw) => Duration::from_secs(parse_number("CACHE_TTL_SECONDS", &raw)?),
            None => default_cache_ttl(),
        };

        Ok(Config {
            karakeep: KarakeepConfig {
                api_base: required("KARAKEEP_API_BASE")?
                    .trim_end_matches('/')
                    .to_string(),
                api_key: required("KARAKEEP_API_KEY")?,
                list_names,
            },
            feed: FeedConfig {
                title: get("FEED_TITLE")
                    .unwrap_or_else(|| "Great Articles from Karakeep".to_string()),
                description: get("FEED_DESCRIPTION")
                    .unwrap_or_else(|| "An RSS feed for your Karakeep lists".to_string()),
                link: get("FEED_LINK").unwrap_or_else(|| "https://karakeep-rss.app".to_string()),
                language: get("FEED_LANGUAGE").unwrap_or_else(|| "en".to_string()),
                copyright: get("FEED_COPYRIGHT").unwrap_or_else(|| default_copyright(&author)),
                author,
                limit,
            },
            cache_ttl,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        })
    }
}

/// Split a comma-separated list of names, dropping blanks
pub fn parse_list_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("KARAKEEP_API_BASE", "https://karakeep.example.com"),
            ("KARAKEEP_API_KEY", "secret"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&minimal())).unwrap();

        assert_eq!(config.karakeep.api_base, "https://karakeep.example.com");
        assert_eq!(config.karakeep.api_key, "secret");
        assert_eq!(config.karakeep.list_names, vec!["Great Articles"]);
        assert_eq!(config.feed.title, "Great Articles from Karakeep");
        assert_eq!(config.feed.language, "en");
        assert_eq!(config.feed.author, "You");
        assert_eq!(
            config.feed.copyright,
            format!("{} You", Utc::now().year())
        );
        assert_eq!(config.feed.limit, 100);
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_missing_api_base() {
        let result = Config::from_lookup(lookup_from(&[("KARAKEEP_API_KEY", "secret")]));
        assert!(matches!(result, Err(ConfigError::Missing("KARAKEEP_API_BASE"))));
    }

    #[test]
    fn test_missing_api_key() {
        let result = Config::from_lookup(lookup_from(&[(
            "KARAKEEP_API_BASE",
            "https://karakeep.example.com",
        )]));
        assert!(matches!(result, Err(ConfigError::Missing("KARAKEEP_API_KEY"))));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let result = Config::from_lookup(lookup_from(&[
            ("KARAKEEP_API_BASE", "https://karakeep.example.com"),
            ("KARAKEEP_API_KEY", "   "),
        ]));
        assert!(matches!(result, Err(ConfigError::Missing("KARAKEEP_API_KEY"))));
    }

    #[test]
    fn test_trailing_slash_removed_from_base() {
        let mut pairs = minimal();
        pairs[0] = ("KARAKEEP_API_BASE", "https://karakeep.example.com/");
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.karakeep.api_base, "https://karakeep.example.com");
    }

    #[test]
    fn test_list_names_parsed() {
        let mut pairs = minimal();
        pairs.push(("KARAKEEP_LIST_NAMES", " Great Articles , Reading,, Later "));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(
            config.karakeep.list_names,
            vec!["Great Articles", "Reading", "Later"]
        );
    }

    #[test]
    fn test_limit_is_capped() {
        let mut pairs = minimal();
        pairs.push(("BOOKMARK_LIMIT", "250"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.feed.limit, MAX_BOOKMARKS);
    }

    #[test]
    fn test_limit_lower_bound() {
        let mut pairs = minimal();
        pairs.push(("BOOKMARK_LIMIT", "0"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.feed.limit, 1);
    }

    #[test]
    fn test_invalid_limit() {
        let mut pairs = minimal();
        pairs.push(("BOOKMARK_LIMIT", "lots"));
        let result = Config::from_lookup(lookup_from(&pairs));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "BOOKMARK_LIMIT", .. })
        ));
    }

    #[test]
    fn test_custom_ttl_and_feed_settings() {
        let mut pairs = minimal();
        pairs.extend([
            ("CACHE_TTL_SECONDS", "30"),
            ("FEED_TITLE", "My Reading"),
            ("FEED_AUTHOR", "Alex"),
            ("FEED_COPYRIGHT", "CC BY 4.0"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.feed.title, "My Reading");
        assert_eq!(config.feed.author, "Alex");
        assert_eq!(config.feed.copyright, "CC BY 4.0");
    }

    #[test]
    fn test_copyright_defaults_to_author() {
        let mut pairs = minimal();
        pairs.push(("FEED_AUTHOR", "Alex"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.feed.copyright.ends_with(" Alex"));
    }

    #[test]
    fn test_parse_list_names_empty() {
        assert!(parse_list_names("").is_empty());
        assert!(parse_list_names(" , ,").is_empty());
    }
}
