//! Google Custom Search client
//!
//! Issues one `GET` per query against the Custom Search JSON API. Domain
//! filters are folded into the query string (`site:` / `-site:`) and then
//! re-checked against each result's host, since the provider treats them as
//! hints rather than hard constraints.

use moka::future::Cache;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{SearchFilters, SearchResult};
use crate::config::SearchConfig;
use crate::error::{Error, Result};

/// Provider cap on results per request
pub const MAX_RESULTS: u8 = 10;

/// Cached result lists
const CACHE_CAPACITY: u64 = 100;

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Search provider client with an in-process result cache
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    api_key: SecretString,
    engine_id: String,
    endpoint: String,
    default_count: u8,
    cache: Cache<String, Arc<Vec<SearchResult>>>,
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("endpoint", &self.endpoint)
            .field("engine_id", &self.engine_id)
            .field("cached", &self.cache.entry_count())
            .finish()
    }
}

impl SearchClient {
    /// Create a client. Fails with `Error::Config` if the key or engine id
    /// is missing.
    pub fn new(config: &SearchConfig, timeout: Duration) -> Result<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(Error::Config("Search API key is not set".to_string()));
        }
        if config.engine_id.trim().is_empty() {
            return Err(Error::Config("Search engine id is not set".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("searchagent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(SearchClient {
            client,
            api_key: config.api_key.clone(),
            engine_id: config.engine_id.clone(),
            endpoint: config.endpoint.clone(),
            default_count: config.num_results.clamp(1, MAX_RESULTS),
            cache,
        })
    }

    /// Default results per call
    pub fn default_count(&self) -> u8 {
        self.default_count
    }

    /// Run a search. Results keep provider order; an empty list is a valid
    /// answer.
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        count: Option<u8>,
    ) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("Search query is empty".to_string()));
        }
        let count = count.unwrap_or(self.default_count).clamp(1, MAX_RESULTS);
        let full_query = build_query(query, filters);
        let key = cache_key(&full_query, filters, count);

        if let Some(hit) = self.cache.get(&key).await {
            debug!("Search cache hit: {}", full_query);
            return Ok(hit.as_ref().clone());
        }

        let results = self.fetch(&full_query, filters, count).await?;
        self.cache.insert(key, Arc::new(results.clone())).await;
        Ok(results)
    }

    async fn fetch(
        &self,
        full_query: &str,
        filters: &SearchFilters,
        count: u8,
    ) -> Result<Vec<SearchResult>> {
        let num = count.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("q", full_query),
            ("key", self.api_key.expose_secret()),
            ("cx", self.engine_id.as_str()),
            ("num", num.as_str()),
        ];
        if let Some(range) = filters.date_range {
            params.push(("dateRestrict", range.date_restrict()));
        }

        info!("Searching: {}", full_query);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::from_request("Search request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, body));
        }

        let body: CseResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse search response: {}", e)))?;

        let total = body.items.len();
        let results: Vec<SearchResult> = body
            .items
            .into_iter()
            .filter(|item| !item.link.is_empty())
            .map(|item| {
                let title = if item.title.is_empty() { "No title".to_string() } else { item.title };
                SearchResult::new(title, item.link, item.snippet)
            })
            .filter(|r| filters.allows(r))
            .take(count as usize)
            .collect();

        if results.len() < total {
            debug!("Host filter kept {}/{} results", results.len(), total);
        }
        info!("Found {} search results for: {}", results.len(), full_query);

        Ok(results)
    }
}

/// Fold domain filters into the query string
pub fn build_query(query: &str, filters: &SearchFilters) -> String {
    let mut q = query.trim().to_string();

    if !filters.include_domains.is_empty() {
        let sites = filters
            .include_domains
            .iter()
            .map(|d| format!("site:{}", d))
            .collect::<Vec<_>>()
            .join(" OR ");
        q = format!("({}) {}", q, sites);
    }

    for domain in &filters.exclude_domains {
        q.push_str(&format!(" -site:{}", domain));
    }

    q
}

fn cache_key(full_query: &str, filters: &SearchFilters, count: u8) -> String {
    format!(
        "{}|{}|{}",
        full_query,
        filters.date_range.map(|r| r.as_str()).unwrap_or("any"),
        count
    )
}

fn classify_failure(status: StatusCode, body: String) -> Error {
    let lowered = body.to_ascii_lowercase();
    let quota = ["quota", "rate limit", "ratelimit"]
        .iter()
        .any(|needle| lowered.contains(needle));

    if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && quota) {
        warn!("Search quota exhausted: {}", status);
        Error::RateLimit(format!("Search provider returned {}", status))
    } else {
        warn!("Search provider error {}: {}", status, body);
        Error::Provider(format!("Search provider returned {}: {}", status, body))
    }
}
