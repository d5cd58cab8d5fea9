use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ─── RateLimitedClient ────────────────────────────────────────────────────────

/// HTTP GET client that spaces requests, honours `Retry-After` on 429 and
/// backs off exponentially on transport and server errors.
pub struct RateLimitedClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    max_retries: u32,
    backoff_base: Duration,
}

impl RateLimitedClient {
    pub fn new(min_interval: Duration, max_retries: u32, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
            max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Scales every backoff sleep; tests shrink it to milliseconds.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_rate_limit().await;
            let resp = self.client.get(url).send().await;
            match resp {
                Ok(r) if r.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let wait = r
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok())
                        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                    if attempt >= self.max_retries {
                        return Err(CatalogError::RateLimit(host_of(url), wait));
                    }
                    warn!(url, wait, attempt, "rate limited, waiting");
                    sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                Ok(r) if r.status().is_server_error() && attempt < self.max_retries => {
                    let backoff = self.backoff(attempt);
                    debug!(url, status = r.status().as_u16(), ?backoff, "server error, retrying");
                    sleep(backoff).await;
                    attempt += 1;
                }
                Ok(r) if !r.status().is_success() => {
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(CatalogError::ApiError(
                        host_of(url),
                        format!("HTTP {status}: {body}"),
                    ));
                }
                Ok(r) => return r.text().await.map_err(CatalogError::Http),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(CatalogError::Http(e));
                    }
                    let backoff = self.backoff(attempt);
                    debug!(url, error = %e, ?backoff, "request failed, retrying");
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.get(url).await?;
        serde_json::from_str(&text).map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(ToOwned::to_owned))
        .unwrap_or_else(|| url.to_string())
}

// ─── DiskCache ────────────────────────────────────────────────────────────────

/// Catalog responses stored as JSON files, one per query, with a time-to-live.
/// Cache failures never fail a lookup.
pub struct DiskCache {
    dir: PathBuf,
    ttl: TimeDelta,
}

#[derive(Serialize, Deserialize)]
struct CachedResponse<T> {
    key: String,
    fetched_at: DateTime<Utc>,
    value: T,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "cache directory unavailable");
        }
        Self {
            dir,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    /// File name is the SHA-256 of the query, so it is stable across builds.
    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{}.json", &digest[..32]))
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now()).await
    }

    async fn get_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let path = self.entry_path(key);
        let bytes = tokio::fs::read(&path).await.ok()?;
        let cached: CachedResponse<T> = serde_json::from_slice(&bytes).ok()?;
        if cached.key != key {
            return None;
        }
        if now - cached.fetched_at > self.ttl {
            debug!(key, fetched_at = %cached.fetched_at, "cache entry expired");
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }
        Some(cached.value)
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_at(key, value, Utc::now()).await;
    }

    async fn set_at<T: Serialize>(&self, key: &str, value: &T, fetched_at: DateTime<Utc>) {
        let cached = CachedResponse {
            key: key.to_string(),
            fetched_at,
            value,
        };
        let written = match serde_json::to_vec(&cached) {
            Ok(bytes) => tokio::fs::write(self.entry_path(key), bytes)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(error) = written {
            debug!(key, %error, "cache write failed");
        }
    }
}
