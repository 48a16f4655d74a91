//! Agent module - LLM client, sessions, prompts, and the tool loop
//!
//! This module handles all AI-related functionality including:
//! - Chat completion client for OpenAI-compatible providers
//! - Session transcripts and the session store
//! - Prompt templates and help text
//! - The orchestrator that runs tool calls between LLM calls

mod client;
mod orchestrator;
pub mod prompts;
mod session;
pub mod types;

pub use client::{CompletionClient, CompletionService};
pub use orchestrator::{
    Agent, AgentReply, LoopCallback, LoopConfig, LoopOutcome, NoOpCallback, ToolObservation,
};
pub use prompts::{help_text, render_system_prompt, PromptTemplate, FALLBACK_MESSAGE};
pub use session::{MemorySessionStore, Session, SessionStore, SharedSession};
pub use types::*;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::search::{ContentExtractor, SearchClient};
use crate::tools::{search_registry, SearchBackend};

/// Everything a front end needs, built from one `Config`
pub struct Runtime {
    pub agent: Agent,
    /// Rendered system prompt for new sessions
    pub system_prompt: String,
    pub help_text: String,
}

impl Runtime {
    /// Wire the LLM client, search tools, and prompts together
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm = CompletionClient::new(config.llm.clone())?;
        let options = llm.default_options();

        let search_timeout = config.fetch.connection_timeout.max(config.fetch.content_timeout);
        let search = SearchClient::new(&config.search, search_timeout)?;
        let extractor = ContentExtractor::new(&config.fetch)?;
        let backend = SearchBackend::new(search, extractor, config.fetch.max_concurrent_requests);
        let tools = search_registry(backend);

        let system_prompt =
            render_system_prompt(config.agent.system_prompt.as_deref(), &tools.names())?;
        let help_text = help_text(&tools.descriptions());

        let loop_config = LoopConfig::from_config(&config.agent, options);
        let agent = Agent::new(Arc::new(llm), tools, loop_config);

        Ok(Runtime {
            agent,
            system_prompt,
            help_text,
        })
    }
}
