//! Configuration validation
//!
//! Validates configuration and reports issues.

use secrecy::ExposeSecret;

use super::types::Config;
use crate::error::{Error, Result};

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }

    /// Collapse errors into a single `Error::Config`
    pub fn into_result(self) -> Result<Vec<ValidationIssue>> {
        if self.valid {
            return Ok(self.warnings);
        }
        let message = self
            .errors
            .iter()
            .map(|issue| issue.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::Config(message))
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_llm_config(config, result);
    result = validate_search_config(config, result);
    result = validate_limits(config, result);

    result
}

fn validate_llm_config(
    config: &Config,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    if config.llm.api_key.expose_secret().is_empty() {
        result = result.with_error(
            ValidationIssue::new("llm.api_key", "LLM API key is missing")
                .with_suggestion("Set LLM_API_KEY or OPENROUTER_API_KEY"),
        );
    }
    if config.llm.model.trim().is_empty() {
        result = result.with_error(
            ValidationIssue::new("llm.model", "No model configured")
                .with_suggestion("Set DEFAULT_MODEL"),
        );
    }
    if url::Url::parse(&config.llm.base_url).is_err() {
        result = result.with_error(ValidationIssue::new(
            "llm.base_url",
            format!("Not a valid URL: {}", config.llm.base_url),
        ));
    }

    result
}

fn validate_search_config(
    config: &Config,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    if config.search.api_key.expose_secret().is_empty() {
        result = result.with_error(
            ValidationIssue::new("search.api_key", "Search API key is missing")
                .with_suggestion("Set SEARCH_ENGINE_API_KEY or GOOGLE_API_KEY"),
        );
    }
    if config.search.engine_id.trim().is_empty() {
        result = result.with_error(
            ValidationIssue::new("search.engine_id", "Search engine id is missing")
                .with_suggestion("Set SEARCH_ENGINE_CSE_ID or GOOGLE_CSE_ID"),
        );
    }
    if config.search.num_results == 0 || config.search.num_results > 10 {
        result = result.with_warning(
            ValidationIssue::new(
                "search.num_results",
                format!("{} is outside 1-10 and will be clamped", config.search.num_results),
            ),
        );
    }

    result
}

fn validate_limits(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.agent.max_history_turns == 0 {
        result = result.with_error(ValidationIssue::new(
            "agent.max_history_turns",
            "Must keep at least one turn",
        ));
    }
    if config.fetch.max_content_length == 0 {
        result = result.with_error(ValidationIssue::new(
            "fetch.max_content_length",
            "Must be greater than zero",
        ));
    }
    if config.fetch.max_concurrent_requests == 0 {
        result = result.with_error(ValidationIssue::new(
            "fetch.max_concurrent_requests",
            "Must be greater than zero",
        ));
    }
    if config.agent.max_tool_rounds == 0 {
        result = result.with_warning(
            ValidationIssue::new("agent.max_tool_rounds", "Tools are effectively disabled")
                .with_suggestion("Set MAX_TOOL_ROUNDS to 1 or more"),
        );
    }

    result
}
