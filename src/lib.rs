//! Karakeep RSS - publishes bookmark lists as an RSS feed
//!
//! This crate fetches bookmarks from a Karakeep-style REST API, cleans up their
//! article content and serves them as an RSS 2.0 document behind a short-lived cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod routes;
pub mod sanitize;
