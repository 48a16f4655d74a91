//! Page fetching and plain-text extraction
//!
//! Fetches a result page and reduces it to a bounded excerpt: noisy subtrees
//! are skipped, the longest article-like container wins, and the text is
//! collapsed to single spaces and cut on a char boundary.

use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE};
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::error::{Error, Result};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const BINARY_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "pdf", "doc", "docx", "xls", "xlsx", "zip", "tar",
];

const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "header", "footer", "nav", "svg", "iframe", "form",
];

const ARTICLE_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    ".article",
    ".post",
    ".content",
    ".entry",
    "#article",
    "#content",
    ".main-content",
];

const TEXT_BLOCK_SELECTOR: &str = "p, h1, h2, h3, h4, h5, li";

/// Below this many chars a candidate is not considered the page's content
const MIN_CONTENT_CHARS: usize = 200;

const ELLIPSIS: char = '…';

/// Fetches pages and returns bounded plain-text excerpts
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    client: Client,
    /// Same limits, no transparent decompression
    raw_client: Client,
    max_content_length: usize,
    timeout: Duration,
}

impl ContentExtractor {
    /// Create an extractor from fetch settings
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connection_timeout)
            .timeout(config.content_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let raw_client = Client::builder()
            .connect_timeout(config.connection_timeout)
            .timeout(config.content_timeout)
            .user_agent(USER_AGENT)
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .build()?;

        Ok(ContentExtractor {
            client,
            raw_client,
            max_content_length: config.max_content_length,
            timeout: config.content_timeout,
        })
    }

    /// Maximum excerpt length in chars
    pub fn max_content_length(&self) -> usize {
        self.max_content_length
    }

    /// Fetch `url` and return its excerpt. Every failure is `Error::Fetch`.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = check_url(url)?;

        debug!("Fetching content from {}", parsed);

        let response = self
            .client
            .get(parsed.clone())
            .header(ACCEPT, "text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.5")
            .send()
            .await
            .map_err(|e| self.fetch_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned HTTP {}", url, status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();
        let kind = PageKind::from_content_type(&content_type)
            .ok_or_else(|| {
                Error::Fetch(format!("{} has unsupported content type {}", url, content_type))
            })?;

        let body = match response.bytes().await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.is_timeout() => return Err(self.fetch_error(url, e)),
            Err(e) => {
                warn!("Could not decode body of {} ({}), retrying without compression", url, e);
                self.fetch_raw(parsed, url).await?
            }
        };

        let excerpt = match kind {
            PageKind::Html => extract_text(&body, self.max_content_length),
            PageKind::Plain => truncate_chars(&collapse_whitespace(&body), self.max_content_length),
        };

        debug!("Extracted {} chars from {}", excerpt.chars().count(), url);
        Ok(excerpt)
    }

    async fn fetch_raw(&self, parsed: Url, url: &str) -> Result<String> {
        let response = self
            .raw_client
            .get(parsed)
            .header(ACCEPT_ENCODING, "identity")
            .send()
            .await
            .map_err(|e| self.fetch_error(url, e))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!("{} returned HTTP {}", url, response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| self.fetch_error(url, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn fetch_error(&self, url: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Fetch(format!("{} timed out after {:?}", url, self.timeout))
        } else if err.is_connect() {
            Error::Fetch(format!("could not connect to {}: {}", url, err))
        } else {
            Error::Fetch(format!("request to {} failed: {}", url, err))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageKind {
    Html,
    Plain,
}

impl PageKind {
    fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next().unwrap_or("").trim();
        match mime {
            "text/html" | "application/xhtml+xml" => Some(PageKind::Html),
            "text/plain" => Some(PageKind::Plain),
            _ => None,
        }
    }
}

/// Reject non-http(s) URLs and obvious binary downloads before any I/O
fn check_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| Error::Fetch(format!("invalid URL {}: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Fetch(format!("unsupported URL scheme: {}", parsed.scheme())));
    }

    let path = parsed.path().to_ascii_lowercase();
    if let Some(ext) = path.rsplit_once('.').map(|(_, ext)| ext) {
        if BINARY_EXTENSIONS.contains(&ext) {
            return Err(Error::Fetch(format!("skipping binary file: {}", url)));
        }
    }

    Ok(parsed)
}

/// Reduce an HTML document to a bounded excerpt
pub fn extract_text(html: &str, max_chars: usize) -> String {
    let doc = Html::parse_document(html);

    // Longest article-like container
    let mut best = String::new();
    for sel in ARTICLE_SELECTORS.iter().filter_map(|s| Selector::parse(s).ok()) {
        for el in doc.select(&sel).filter(|el| !inside_skipped(el)) {
            let text = element_text(&el);
            if text.chars().count() > best.chars().count() {
                best = text;
            }
        }
    }

    if best.chars().count() < MIN_CONTENT_CHARS {
        if let Ok(sel) = Selector::parse(TEXT_BLOCK_SELECTOR) {
            let blocks: Vec<String> = doc
                .select(&sel)
                .filter(|el| !inside_skipped(el))
                .map(|el| element_text(&el))
                .filter(|t| !t.is_empty())
                .collect();
            let joined = blocks.join(" ");
            if joined.chars().count() > best.chars().count() {
                best = joined;
            }
        }
    }

    if best.chars().count() < MIN_CONTENT_CHARS {
        let body = Selector::parse("body")
            .ok()
            .and_then(|sel| doc.select(&sel).next().map(|el| element_text(&el)))
            .unwrap_or_else(|| element_text(&doc.root_element()));
        if body.chars().count() > best.chars().count() {
            best = body;
        }
    }

    truncate_chars(&best, max_chars)
}

fn inside_skipped(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(|node| node.value().as_element().map(|e| e.name()))
        .any(|name| SKIP_TAGS.contains(&name))
}

/// Visible text of an element with noisy subtrees skipped, whitespace
/// collapsed
fn element_text(el: &ElementRef<'_>) -> String {
    let mut buf = String::new();
    collect_text(el, &mut buf);
    collapse_whitespace(&buf)
}

fn collect_text(node: &ElementRef<'_>, buf: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(el) => {
                if SKIP_TAGS.contains(&el.name()) {
                    continue;
                }
                buf.push(' ');
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(&child_ref, buf);
                }
            }
            _ => {}
        }
    }
}

/// Collapse every whitespace run to a single space
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut to at most `max_chars` chars, marking a cut with `…`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor(max: usize, timeout: Duration) -> ContentExtractor {
        ContentExtractor::new(&FetchConfig {
            connection_timeout: timeout,
            content_timeout: timeout,
            max_content_length: max,
            max_concurrent_requests: 2,
        })
        .unwrap()
    }

    fn long_paragraph(word: &str) -> String {
        std::iter::repeat(word).take(80).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("héllo wörld and more", 8), "héllo w…");
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo…");
        assert_eq!(truncate_chars("anything", 0), "");
    }

    #[test]
    fn test_check_url() {
        assert!(check_url("https://example.com/page").is_ok());
        assert!(matches!(check_url("ftp://example.com/file"), Err(Error::Fetch(_))));
        assert!(matches!(check_url("https://example.com/report.PDF"), Err(Error::Fetch(_))));
        assert!(matches!(check_url("not a url"), Err(Error::Fetch(_))));
    }

    #[test]
    fn test_extract_prefers_article() {
        let html = format!(
            r#"<html><head><style>body {{ color: red }}</style></head><body>
                <nav><ul><li>Home</li><li>About</li></ul></nav>
                <article><h1>Title</h1><p>{}</p><script>alert(1)</script></article>
                <footer>Copyright</footer>
            </body></html>"#,
            long_paragraph("content")
        );
        let text = extract_text(&html, 5000);
        assert!(text.starts_with("Title content"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("Home"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_extract_falls_back_to_blocks() {
        let html = format!(
            "<html><body><div><p>{}</p><li>item one</li></div><nav><li>skip me</li></nav></body></html>",
            long_paragraph("para")
        );
        let text = extract_text(&html, 5000);
        assert!(text.contains("item one"));
        assert!(!text.contains("skip me"));
    }

    #[test]
    fn test_extract_respects_bound() {
        let html = format!("<html><body><main><p>{}</p></main></body></html>", long_paragraph("wordy"));
        let text = extract_text(&html, 50);
        assert!(text.chars().count() <= 50);
        assert!(text.ends_with('…'));
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let server = MockServer::start().await;
        let body = format!("<html><body><main><p>{}</p></main></body></html>", long_paragraph("rust"));
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
            .mount(&server)
            .await;

        let text = extractor(100, Duration::from_secs(5))
            .fetch(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert!(text.starts_with("rust rust"));
        assert!(text.chars().count() <= 100);
    }

    #[tokio::test]
    async fn test_fetch_rejects_binary_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8, 1, 2], "application/octet-stream"))
            .mount(&server)
            .await;

        let err = extractor(100, Duration::from_secs(5))
            .fetch(&format!("{}/blob", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = extractor(100, Duration::from_secs(5))
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_fast() {
        let timeout = Duration::from_millis(500);
        let started = Instant::now();
        let err = extractor(100, timeout)
            .fetch("http://127.0.0.1:1/")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_slow_page_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<p>late</p>", "text/html")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let started = Instant::now();
        let err = extractor(100, Duration::from_millis(300))
            .fetch(&format!("{}/slow", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_bad_compression_falls_back_to_raw() {
        let server = MockServer::start().await;
        let html = format!("<html><body><main><p>{}</p></main></body></html>", long_paragraph("raw"));
        Mock::given(method("GET"))
            .and(header("accept-encoding", "identity"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(html.clone(), "text/html"))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-encoding", "gzip")
                    .set_body_raw(html, "text/html"),
            )
            .mount(&server)
            .await;

        let text = extractor(5000, Duration::from_secs(5))
            .fetch(&format!("{}/gz", server.uri()))
            .await
            .unwrap();
        assert!(text.starts_with("raw raw"));
    }
}
