//! Prompt templates and engineering

use chrono::Utc;
use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{Error, Result};

/// A prompt template using Handlebars syntax
pub struct PromptTemplate {
    /// Template name
    name: String,
    /// Handlebars registry
    registry: Handlebars<'static>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(name: impl Into<String>, template: &str) -> Result<Self> {
        let name = name.into();
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        registry
            .register_template_string(&name, template)
            .map_err(|e| Error::Config(format!("Invalid template: {}", e)))?;

        Ok(PromptTemplate { name, registry })
    }

    /// Render the template with given data
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        self.registry
            .render(&self.name, data)
            .map_err(|e| Error::Internal(format!("Template render error: {}", e)))
    }
}

/// Default system prompt. Variables: `date`, `tools`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a research assistant with live web search. Today is {{date}}.

Available tools: {{#each tools}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}.

Guidelines:
- Answer directly from your own knowledge when the question is stable and well known.
- Use search for recent events, specific facts you are unsure of, or when the user asks you to look something up.
- Use advanced_search when the user names sites to include or exclude, or a time range.
- Cite the sources you used by title and URL.
- If searching finds nothing useful, say so plainly instead of guessing."#;

/// Message returned when the model produces neither text nor tool calls
pub const FALLBACK_MESSAGE: &str =
    "I couldn't produce an answer for that. Please try rephrasing or asking a more specific question.";

#[derive(Serialize)]
struct SystemPromptVars<'a> {
    date: String,
    tools: &'a [String],
}

/// Render the system prompt. `template` overrides the default.
pub fn render_system_prompt(template: Option<&str>, tools: &[String]) -> Result<String> {
    let template = PromptTemplate::new("system", template.unwrap_or(DEFAULT_SYSTEM_PROMPT))?;
    template.render(&SystemPromptVars {
        date: Utc::now().format("%Y-%m-%d").to_string(),
        tools,
    })
}

/// Help text listing tools and terminal commands
pub fn help_text(tools: &[(String, String)]) -> String {
    let mut text = String::from("Available tools:\n");
    for (name, description) in tools {
        text.push_str(&format!("  - {}: {}\n", name, description));
    }
    text.push_str("\nCommands:\n");
    text.push_str("  - help: Show this help message\n");
    text.push_str("  - clear: Clear conversation history\n");
    text.push_str("  - tools: List available tools\n");
    text.push_str("  - history: Show the conversation so far\n");
    text.push_str("  - exit/quit/q: Exit the program");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_rendering() {
        let template = PromptTemplate::new("greet", "Hello, {{name}}!").unwrap();
        let result = template.render(&serde_json::json!({"name": "World"})).unwrap();
        assert_eq!(result, "Hello, World!");
    }

    #[test]
    fn test_invalid_template_is_config_error() {
        assert!(matches!(PromptTemplate::new("bad", "{{#each tools}}unclosed"), Err(Error::Config(_))));
    }

    #[test]
    fn test_default_system_prompt() {
        let tools = vec!["search".to_string(), "advanced_search".to_string()];
        let prompt = render_system_prompt(None, &tools).unwrap();
        assert!(prompt.contains("Available tools: search, advanced_search."));
        assert!(prompt.contains(&Utc::now().format("%Y-%m-%d").to_string()));
    }

    #[test]
    fn test_custom_system_prompt() {
        let prompt = render_system_prompt(Some("First: {{tools.[0]}} <ok>"), &["search".to_string()]).unwrap();
        assert_eq!(prompt, "First: search <ok>");
    }

    #[test]
    fn test_help_text() {
        let text = help_text(&[("search".to_string(), "Search the web".to_string())]);
        assert!(text.contains("search: Search the web"));
        assert!(text.contains("exit/quit/q"));
    }
}
