//! Web search tools
//!
//! `search` takes comma-separated site lists; `advanced_search` takes domain
//! arrays and a date range. Both fetch a page excerpt for each hit and render
//! numbered `SOURCE n` blocks for the model, with the structured list as
//! metadata.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::traits::{Tool, ToolResult};
use crate::error::{Error, Result};
use crate::search::{
    normalize_domains, parse_domain_list, ContentExtractor, DateRange, SearchClient, SearchFilters,
    SearchResult, MAX_RESULTS,
};

const STOP_WORDS: &[&str] = &["what", "how", "when", "where", "who", "is", "are", "the", "a", "an"];

/// Search client plus extractor, shared by both tools
#[derive(Clone)]
pub struct SearchBackend {
    client: Arc<SearchClient>,
    extractor: Arc<ContentExtractor>,
    max_concurrent: usize,
}

impl SearchBackend {
    /// Bundle a client and an extractor. `max_concurrent` bounds page
    /// fetches per call.
    pub fn new(client: SearchClient, extractor: ContentExtractor, max_concurrent: usize) -> Self {
        SearchBackend {
            client: Arc::new(client),
            extractor: Arc::new(extractor),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Search, retrying once with a simplified query when nothing comes
    /// back, then attach excerpts. Returns the query that produced the
    /// results.
    pub async fn search_and_extract(
        &self,
        query: &str,
        filters: &SearchFilters,
        count: Option<u8>,
    ) -> Result<(String, Vec<SearchResult>)> {
        let started = Instant::now();
        let mut used_query = query.trim().to_string();
        let mut results = self.client.search(&used_query, filters, count).await?;

        if results.is_empty() {
            let simplified = simplify_query(&used_query);
            if !simplified.is_empty() && simplified != used_query {
                info!("No results for '{}', trying simplified query '{}'", used_query, simplified);
                results = self.client.search(&simplified, filters, count).await?;
                used_query = simplified;
            }
        }

        let results = self.attach_excerpts(results).await;
        debug!(
            "Search for '{}' finished in {:.2}s with {} results",
            used_query,
            started.elapsed().as_secs_f64(),
            results.len()
        );
        Ok((used_query, results))
    }

    /// Fetch excerpts concurrently, keeping provider order. A failed fetch
    /// leaves an empty excerpt.
    async fn attach_excerpts(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        stream::iter(results.into_iter().map(|mut result| {
            let extractor = Arc::clone(&self.extractor);
            async move {
                match extractor.fetch(&result.url).await {
                    Ok(text) => result.excerpt = Some(text),
                    Err(e) => {
                        warn!("Excerpt unavailable for {}: {}", result.url, e);
                        result.excerpt = Some(String::new());
                    }
                }
                result
            }
        }))
        .buffered(self.max_concurrent)
        .collect()
        .await
    }
}

/// Strip punctuation and question/stop words
pub fn simplify_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c.is_whitespace() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render results as numbered source blocks
pub fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!(
            "No results found for \"{}\". Try rephrasing the question, using different keywords, or loosening the site filters.",
            query
        );
    }

    let mut output = format!("Search results for \"{}\":\n\n", query);
    for (i, result) in results.iter().enumerate() {
        output.push_str(&format!("SOURCE {}: {}\n", i + 1, result.title));
        output.push_str(&format!("URL: {}\n", result.url));
        output.push_str(&format!("SUMMARY: {}\n", result.snippet));
        match result.excerpt.as_deref() {
            Some(text) if !text.is_empty() => output.push_str(&format!("CONTENT:\n{}\n\n", text)),
            _ => output.push_str("CONTENT: (page content unavailable)\n\n"),
        }
    }
    output.trim_end().to_string()
}

fn query_arg(args: &Value) -> Result<&str> {
    args.get("query")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| Error::InvalidInput("Missing 'query' parameter".to_string()))
}

fn count_arg(args: &Value) -> Option<u8> {
    args.get("num_results")
        .and_then(|v| v.as_u64())
        .map(|n| n.clamp(1, u64::from(MAX_RESULTS)) as u8)
}

fn string_list_arg(args: &Value, key: &str) -> Vec<String> {
    match args.get(key) {
        Some(Value::Array(items)) => normalize_domains(items.iter().filter_map(Value::as_str)),
        Some(Value::String(list)) => parse_domain_list(list),
        _ => Vec::new(),
    }
}

async fn run_search(
    backend: &SearchBackend,
    query: &str,
    filters: SearchFilters,
    count: Option<u8>,
) -> ToolResult {
    match backend.search_and_extract(query, &filters, count).await {
        Ok((used_query, results)) => {
            let text = format_results(&used_query, &results);
            let metadata = json!({ "query": used_query, "results": results });
            ToolResult::success_with_metadata(text, metadata)
        }
        Err(e) => {
            warn!("Search for '{}' failed: {}", query, e);
            ToolResult::failure(format!("Search failed: {}", e))
        }
    }
}

/// Basic web search
pub struct SearchTool {
    backend: SearchBackend,
}

impl SearchTool {
    /// Create the tool
    pub fn new(backend: SearchBackend) -> Self {
        SearchTool { backend }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns titles, URLs, snippets, and page content of the top results."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "site_filter": {
                    "type": "string",
                    "description": "Comma-separated domains to search within (e.g. 'python.org,docs.rs')"
                },
                "exclude_sites": {
                    "type": "string",
                    "description": "Comma-separated domains to leave out"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (1-10, default: 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let query = query_arg(&args)?;
        let filters = SearchFilters {
            include_domains: string_list_arg(&args, "site_filter"),
            exclude_domains: string_list_arg(&args, "exclude_sites"),
            date_range: None,
        };

        Ok(run_search(&self.backend, query, filters, count_arg(&args)).await)
    }
}

/// Search with domain lists and a recency filter
pub struct AdvancedSearchTool {
    backend: SearchBackend,
}

impl AdvancedSearchTool {
    /// Create the tool
    pub fn new(backend: SearchBackend) -> Self {
        AdvancedSearchTool { backend }
    }
}

#[async_trait]
impl Tool for AdvancedSearchTool {
    fn name(&self) -> &str {
        "advanced_search"
    }

    fn description(&self) -> &str {
        "Search the web with filters: restrict to or exclude specific domains and limit results to a time range."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "include_domains": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Only return results from these domains (e.g. [\"python.org\"])"
                },
                "exclude_domains": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Never return results from these domains"
                },
                "date_range": {
                    "type": "string",
                    "enum": ["past_hour", "past_day", "past_week", "past_month", "past_year"],
                    "description": "Only return results from this period"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (1-10, default: 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let query = query_arg(&args)?;
        let date_range = match args.get("date_range").and_then(|v| v.as_str()) {
            Some(raw) => match raw.parse::<DateRange>() {
                Ok(range) => Some(range),
                Err(e) => return Ok(ToolResult::failure(e.to_string())),
            },
            None => None,
        };

        let filters = SearchFilters {
            include_domains: string_list_arg(&args, "include_domains"),
            exclude_domains: string_list_arg(&args, "exclude_domains"),
            date_range,
        };

        Ok(run_search(&self.backend, query, filters, count_arg(&args)).await)
    }
}
