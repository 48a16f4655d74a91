//! Search module - provider client and page content extraction
//!
//! - `SearchClient`: Google Custom Search with domain/date filters and a TTL cache
//! - `ContentExtractor`: fetches result pages and returns bounded plain text

mod client;
mod content;
mod types;

pub use client::{build_query, SearchClient, MAX_RESULTS};
pub use content::{collapse_whitespace, extract_text, truncate_chars, ContentExtractor};
pub use types::{
    host_matches, normalize_domains, parse_domain_list, DateRange, SearchFilters, SearchResult,
};
