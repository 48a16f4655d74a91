//! Configuration I/O - Loading configuration
//!
//! Handles reading configuration from files and environment variables.

use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file (config.json / config.toml) if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    // .env first; it may name the config file
    dotenvy::dotenv().ok();
    load_config_layered(|key| std::env::var(key).ok())
}

/// Layer the config file and `lookup` variables over the defaults. The file
/// is `SEARCHAGENT_CONFIG` from `lookup` when set, else the default path.
pub fn load_config_layered<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = lookup("SEARCHAGENT_CONFIG")
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(super::paths::config_path);

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_overrides_from(&mut config, lookup);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    // Detect format by extension
    let config: Config = if path.extension().map_or(false, |ext| ext == "json") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        // Try JSON5 first, then TOML
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Overlay process environment variables onto a config.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Overlay variables from `lookup` onto a config. Env has the highest
/// precedence: defaults < file < env.
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));
    let secs = |key: &str| {
        lookup(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    };
    let parsed = |key: &str| lookup(key).map(|v| v.trim().to_string());

    // LLM
    if let Some(key) = first(&["LLM_API_KEY", "OPENROUTER_API_KEY"]) {
        config.llm.api_key = SecretString::from(key);
    }
    if let Some(model) = first(&["DEFAULT_MODEL"]) {
        config.llm.model = model;
    }
    if let Some(url) = first(&["LLM_BASE_URL"]) {
        config.llm.base_url = url;
    }
    if let Some(timeout) = secs("LLM_TIMEOUT") {
        config.llm.timeout = timeout;
    }
    if let Some(v) = parsed("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
        config.llm.temperature = v;
    }

    // Search
    if let Some(key) = first(&["SEARCH_ENGINE_API_KEY", "GOOGLE_API_KEY"]) {
        config.search.api_key = SecretString::from(key);
    }
    if let Some(cx) = first(&["SEARCH_ENGINE_CSE_ID", "GOOGLE_CSE_ID"]) {
        config.search.engine_id = cx;
    }
    if let Some(endpoint) = first(&["SEARCH_ENDPOINT"]) {
        config.search.endpoint = endpoint;
    }
    if let Some(v) = parsed("SEARCH_NUM_RESULTS").and_then(|v| v.parse().ok()) {
        config.search.num_results = v;
    }
    if let Some(ttl) = secs("CACHE_TTL") {
        config.search.cache_ttl = ttl;
    }

    // Fetch
    if let Some(timeout) = secs("CONNECTION_TIMEOUT") {
        config.fetch.connection_timeout = timeout;
    }
    if let Some(timeout) = secs("CONTENT_TIMEOUT") {
        config.fetch.content_timeout = timeout;
    }
    if let Some(v) = parsed("MAX_CONTENT_LENGTH").and_then(|v| v.parse().ok()) {
        config.fetch.max_content_length = v;
    }
    if let Some(v) = parsed("MAX_CONCURRENT_REQUESTS").and_then(|v| v.parse().ok()) {
        config.fetch.max_concurrent_requests = v;
    }

    // Agent
    if let Some(v) = parsed("MAX_HISTORY_TURNS").and_then(|v| v.parse().ok()) {
        config.agent.max_history_turns = v;
    }
    if let Some(v) = parsed("MAX_TOOL_ROUNDS").and_then(|v| v.parse().ok()) {
        config.agent.max_tool_rounds = v;
    }
    if let Some(prompt) = first(&["SYSTEM_PROMPT"]) {
        config.agent.system_prompt = Some(prompt);
    }

    // Web
    if let Some(bind) = first(&["WEB_BIND"]) {
        config.web.bind = bind;
    }
    if let Some(port) = parsed("WEB_PORT").and_then(|v| v.parse().ok()) {
        config.web.port = port;
    }
    if let Some(timeout) = secs("REQUEST_TIMEOUT") {
        config.web.request_timeout = timeout;
    }
    if let Some(idle) = secs("SESSION_IDLE_TIMEOUT") {
        config.web.session_idle_timeout = idle;
    }
    if let Some(v) = parsed("MAX_SESSIONS").and_then(|v| v.parse().ok()) {
        config.web.max_sessions = v;
    }

    // Logging
    if let Some(level) = first(&["RUST_LOG"]) {
        config.log.level = level;
    }
    if let Some(format) = first(&["LOG_FORMAT"]) {
        config.log.format = format;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_load_json5_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                // comments are fine in JSON5
                llm: { model: "openai/gpt-4o-mini" },
                fetch: { max_content_length: 1200, content_timeout: "5s" },
            }"#,
        )
        .unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.llm.model, "openai/gpt-4o-mini");
        assert_eq!(loaded.fetch.max_content_length, 1200);
        assert_eq!(loaded.fetch.content_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[web\nport = ").unwrap();

        let err = load_config_from_path(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENROUTER_API_KEY", "sk-test"),
            ("GOOGLE_API_KEY", "g-key"),
            ("GOOGLE_CSE_ID", "cx-1"),
            ("MAX_CONTENT_LENGTH", "800"),
            ("CONTENT_TIMEOUT", "7"),
            ("MAX_TOOL_ROUNDS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_overrides_from(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.expose_secret(), "sk-test");
        assert_eq!(config.search.api_key.expose_secret(), "g-key");
        assert_eq!(config.search.engine_id, "cx-1");
        assert_eq!(config.fetch.max_content_length, 800);
        assert_eq!(config.fetch.content_timeout, Duration::from_secs(7));
        // Unparseable values leave the default in place
        assert_eq!(config.agent.max_tool_rounds, 5);
    }

    #[test]
    fn test_dotenv_names_config_file() {
        let dir = tempdir().unwrap();
        let config_file = dir.path().join("searchagent.toml");
        std::fs::write(&config_file, "[web]\nport = 9100\n").unwrap();
        let dotenv = dir.path().join(".env");
        std::fs::write(
            &dotenv,
            format!("SEARCHAGENT_CONFIG={}\nMAX_SESSIONS=7\n", config_file.display()),
        )
        .unwrap();

        let env: HashMap<String, String> = dotenvy::from_path_iter(&dotenv)
            .unwrap()
            .map(|item| item.unwrap())
            .collect();

        let config = load_config_layered(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.web.port, 9100);
        assert_eq!(config.web.max_sessions, 7);
    }

    #[test]
    fn test_primary_env_name_wins() {
        let env: HashMap<&str, &str> = [
            ("SEARCH_ENGINE_API_KEY", "primary"),
            ("GOOGLE_API_KEY", "fallback"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_overrides_from(&mut config, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.search.api_key.expose_secret(), "primary");
    }
}
