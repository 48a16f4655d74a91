//! Configuration types
//!
//! Every section deserializes with defaults so a partial config file (or
//! none at all) still produces a complete `Config`; credentials come from
//! the environment.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Search provider settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Page fetching settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Web front end settings
    #[serde(default)]
    pub web: WebConfig,

    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from the config file and environment
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

/// LLM chat-completion provider (any OpenAI-compatible endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Default model
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    /// Per-call timeout
    #[serde(with = "humantime_serde", default = "default_llm_timeout")]
    pub timeout: Duration,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            api_key: default_secret(),
            model: default_model(),
            base_url: default_llm_url(),
            timeout: default_llm_timeout(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

fn default_model() -> String {
    "google/gemini-2.5-flash".to_string()
}

fn default_llm_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_llm_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_temperature() -> f32 {
    0.7
}

/// Search provider (Google Custom Search JSON API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Programmable search engine id (`cx`)
    #[serde(default)]
    pub engine_id: String,
    /// Endpoint URL
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    /// Results requested per query
    #[serde(default = "default_num_results")]
    pub num_results: u8,
    /// Lifetime of cached result lists
    #[serde(with = "humantime_serde", default = "default_cache_ttl")]
    pub cache_ttl: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            api_key: default_secret(),
            engine_id: String::new(),
            endpoint: default_search_endpoint(),
            num_results: default_num_results(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_num_results() -> u8 {
    5
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(3600)
}

/// Page fetching and excerpt limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// TCP connect timeout
    #[serde(with = "humantime_serde", default = "default_connection_timeout")]
    pub connection_timeout: Duration,
    /// Whole-request timeout for a page fetch
    #[serde(with = "humantime_serde", default = "default_content_timeout")]
    pub content_timeout: Duration,
    /// Maximum excerpt length in characters
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
    /// Maximum pages fetched at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            connection_timeout: default_connection_timeout(),
            content_timeout: default_content_timeout(),
            max_content_length: default_max_content_length(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_content_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_max_content_length() -> usize {
    5000
}

fn default_max_concurrent() -> usize {
    5
}

/// Orchestrator limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum turns kept in a session transcript
    #[serde(default = "default_max_history")]
    pub max_history_turns: usize,
    /// Maximum tool rounds per request
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// System prompt override (handlebars template)
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            max_history_turns: default_max_history(),
            max_tool_rounds: default_max_tool_rounds(),
            system_prompt: None,
        }
    }
}

fn default_max_history() -> usize {
    40
}

fn default_max_tool_rounds() -> u32 {
    5
}

/// Web front end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on one chat request
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// Sessions idle longer than this are dropped
    #[serde(with = "humantime_serde", default = "default_session_idle")]
    pub session_idle_timeout: Duration,
    /// Maximum live sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            bind: default_bind(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            session_idle_timeout: default_session_idle(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(180)
}

fn default_session_idle() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_max_sessions() -> u64 {
    10_000
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info,searchagent=debug".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.llm.model, "google/gemini-2.5-flash");
        assert_eq!(config.fetch.max_content_length, 5000);
        assert_eq!(config.fetch.connection_timeout, Duration::from_secs(10));
        assert_eq!(config.search.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.web.port, 8001);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [fetch]
            content_timeout = "3s"

            [agent]
            max_tool_rounds = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.content_timeout, Duration::from_secs(3));
        assert_eq!(config.fetch.max_concurrent_requests, 5);
        assert_eq!(config.agent.max_tool_rounds, 2);
        assert_eq!(config.agent.max_history_turns, 40);
    }
}
