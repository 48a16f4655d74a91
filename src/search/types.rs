//! Search value types

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// One ranked hit from the search provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title
    pub title: String,
    /// Result URL
    pub url: String,
    /// Provider snippet
    pub snippet: String,
    /// Plain-text excerpt of the page, when fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl SearchResult {
    /// Create a result without an excerpt
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        SearchResult {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            excerpt: None,
        }
    }

    /// Lowercased host of the result URL
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }
}

/// Recency restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    PastHour,
    PastDay,
    PastWeek,
    PastMonth,
    PastYear,
}

impl DateRange {
    /// Value for the provider's `dateRestrict` parameter. The provider has
    /// no sub-day granularity, so the past hour widens to one day.
    pub fn date_restrict(&self) -> &'static str {
        match self {
            DateRange::PastHour | DateRange::PastDay => "d1",
            DateRange::PastWeek => "w1",
            DateRange::PastMonth => "m1",
            DateRange::PastYear => "y1",
        }
    }

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::PastHour => "past_hour",
            DateRange::PastDay => "past_day",
            DateRange::PastWeek => "past_week",
            DateRange::PastMonth => "past_month",
            DateRange::PastYear => "past_year",
        }
    }
}

impl FromStr for DateRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "past_hour" | "hour" => Ok(DateRange::PastHour),
            "past_day" | "day" => Ok(DateRange::PastDay),
            "past_week" | "week" => Ok(DateRange::PastWeek),
            "past_month" | "month" => Ok(DateRange::PastMonth),
            "past_year" | "year" => Ok(DateRange::PastYear),
            other => Err(Error::InvalidInput(format!(
                "Unknown date range '{}' (expected past_hour, past_day, past_week, past_month or past_year)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call search filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SearchFilters {
    /// Only keep results from these domains (and their subdomains)
    pub include_domains: Vec<String>,
    /// Drop results from these domains (and their subdomains)
    pub exclude_domains: Vec<String>,
    /// Recency restriction
    pub date_range: Option<DateRange>,
}

impl SearchFilters {
    /// Builder: restrict to domains
    pub fn include<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.include_domains = normalize_domains(domains);
        self
    }

    /// Builder: exclude domains
    pub fn exclude<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_domains = normalize_domains(domains);
        self
    }

    /// Builder: recency restriction
    pub fn within(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Whether a result's host passes the include/exclude lists
    pub fn allows(&self, result: &SearchResult) -> bool {
        let Some(host) = result.host() else {
            return self.include_domains.is_empty();
        };
        if self.exclude_domains.iter().any(|d| host_matches(&host, d)) {
            return false;
        }
        self.include_domains.is_empty()
            || self.include_domains.iter().any(|d| host_matches(&host, d))
    }
}

/// `true` when `host` is `domain` or one of its subdomains
pub fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.strip_suffix(domain).is_some_and(|prefix| prefix.ends_with('.'))
}

/// Lowercase, strip scheme / `www.` / path, drop empties and duplicates
pub fn normalize_domains<I, S>(domains: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in domains {
        let mut d = raw.as_ref().trim().to_ascii_lowercase();
        for prefix in ["https://", "http://"] {
            if let Some(rest) = d.strip_prefix(prefix) {
                d = rest.to_string();
            }
        }
        if let Some(rest) = d.strip_prefix("www.") {
            d = rest.to_string();
        }
        if let Some(idx) = d.find('/') {
            d.truncate(idx);
        }
        if !d.is_empty() && !out.contains(&d) {
            out.push(d);
        }
    }
    out
}

/// Split a comma-separated domain list
pub fn parse_domain_list(list: &str) -> Vec<String> {
    normalize_domains(list.split(','))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_parsing() {
        assert_eq!("past_week".parse::<DateRange>().unwrap(), DateRange::PastWeek);
        assert_eq!("Month".parse::<DateRange>().unwrap(), DateRange::PastMonth);
        assert_eq!(DateRange::PastHour.date_restrict(), "d1");
        assert_eq!(DateRange::PastYear.date_restrict(), "y1");
        assert!("fortnight".parse::<DateRange>().is_err());
    }

    #[test]
    fn test_host_matching() {
        assert!(host_matches("python.org", "python.org"));
        assert!(host_matches("docs.python.org", "python.org"));
        assert!(!host_matches("notpython.org", "python.org"));
        assert!(!host_matches("python.org.evil.com", "python.org"));
    }

    #[test]
    fn test_normalize_domains() {
        let domains = parse_domain_list(" https://www.Python.org/docs , wikipedia.org,, python.org");
        assert_eq!(domains, vec!["python.org", "wikipedia.org"]);
    }

    #[test]
    fn test_filters_allow() {
        let filters = SearchFilters::default()
            .include(["python.org"])
            .exclude(["wiki.python.org"]);

        assert!(filters.allows(&SearchResult::new("t", "https://docs.python.org/3/", "")));
        assert!(!filters.allows(&SearchResult::new("t", "https://wiki.python.org/moin", "")));
        assert!(!filters.allows(&SearchResult::new("t", "https://realpython.com/", "")));
        assert!(SearchFilters::default().allows(&SearchResult::new("t", "https://a.b/", "")));
    }
}
