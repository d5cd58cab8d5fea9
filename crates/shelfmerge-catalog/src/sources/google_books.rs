use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use shelfmerge_core::config::CatalogConfig;
use shelfmerge_core::normalize::{normalize_isbn, normalize_language, normalize_pub_date};
use shelfmerge_core::{Isbn, RawSecondaryRecord};
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::http::{DiskCache, RateLimitedClient};
use crate::sources::{CatalogLookup, CatalogQuery};

pub struct GoogleBooksSource {
    client: RateLimitedClient,
    cache: DiskCache,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleBooksSource {
    pub fn from_config(config: &CatalogConfig, cache_dir: PathBuf) -> Result<Self> {
        let client = RateLimitedClient::new(
            Duration::from_millis(config.min_interval_ms),
            config.max_retries,
            &config.user_agent,
        )?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Ok(Self {
            client,
            cache: DiskCache::new(cache_dir, Duration::from_secs(config.cache_ttl_secs)),
            base_url: config.base_url.clone(),
            api_key,
        })
    }

    pub fn with_params(base_url: &str, client: RateLimitedClient, cache: DiskCache) -> Self {
        Self {
            client,
            cache,
            base_url: base_url.to_string(),
            api_key: None,
        }
    }

    /// Raw `volumes` response for one `q` string, served from cache when fresh.
    pub async fn search(&self, q: &str) -> Result<Value> {
        let cache_key = format!("volumes:{q}");
        if let Some(cached) = self.cache.get::<Value>(&cache_key).await {
            debug!(q, "catalog cache hit");
            return Ok(cached);
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| CatalogError::Parse(format!("invalid URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| CatalogError::Parse("invalid catalog base URL".to_string()))?
            .pop_if_empty()
            .push("volumes");
        url.query_pairs_mut().append_pair("q", q);
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }

        let json: Value = self.client.get_json(url.as_str()).await?;
        self.cache.set(&cache_key, &json).await;
        Ok(json)
    }
}

#[async_trait]
impl CatalogLookup for GoogleBooksSource {
    fn name(&self) -> &str {
        "google_books"
    }

    async fn lookup(&self, query: &CatalogQuery) -> Result<Option<RawSecondaryRecord>> {
        let json = self.search(&query.to_q()).await?;
        Ok(json
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .map(volume_to_record))
    }
}

/// Flattens one `volumes` item into a catalog CSV row.
pub fn volume_to_record(item: &Value) -> RawSecondaryRecord {
    let info = item.get("volumeInfo").unwrap_or(&Value::Null);
    let sale = item.get("saleInfo").unwrap_or(&Value::Null);

    let mut isbn13 = None;
    let mut isbn10 = None;
    for id in info
        .get("industryIdentifiers")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if !matches!(
            id.get("type").and_then(Value::as_str),
            Some("ISBN_13" | "ISBN_10")
        ) {
            continue;
        }
        // The digit count decides the slot; the type label is sometimes wrong.
        match id
            .get("identifier")
            .and_then(Value::as_str)
            .and_then(normalize_isbn)
        {
            Some(Isbn::Thirteen(isbn)) => isbn13 = Some(isbn),
            Some(Isbn::Ten(isbn)) => isbn10 = Some(isbn),
            None => {}
        }
    }

    let list_price = sale.get("listPrice");

    RawSecondaryRecord {
        gb_id: text(item, "id"),
        title: text(info, "title"),
        subtitle: text(info, "subtitle"),
        authors: joined(info, "authors"),
        publisher: text(info, "publisher"),
        pub_date: info
            .get("publishedDate")
            .and_then(Value::as_str)
            .and_then(normalize_pub_date)
            .map(|date| date.to_iso()),
        language: info
            .get("language")
            .and_then(Value::as_str)
            .and_then(normalize_language),
        categories: joined(info, "categories"),
        isbn13: isbn13.map(|isbn| isbn.to_string()),
        isbn10: isbn10.map(|isbn| isbn.to_string()),
        price_amount: list_price
            .and_then(|p| p.get("amount"))
            .filter(|amount| amount.is_number())
            .map(Value::to_string),
        price_currency: list_price.and_then(|p| text(p, "currencyCode")),
        source_file: None,
    }
}

fn text(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

fn joined(v: &Value, key: &str) -> Option<String> {
    let parts: Vec<&str> = v
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    (!parts.is_empty()).then(|| parts.join(", "))
}
