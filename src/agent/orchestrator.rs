//! Agent orchestrator
//!
//! Runs the LLM-call / tool-call loop for one user message against a
//! session. Tool traffic for the request is staged locally and committed to
//! the session together with the final answer, so a failed (or cancelled)
//! request leaves only the user's turn behind.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::agent::client::CompletionService;
use crate::agent::prompts::FALLBACK_MESSAGE;
use crate::agent::session::Session;
use crate::agent::types::*;
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::tools::{ToolCall, ToolRegistry};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configurable limits for the loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Maximum tool rounds before tools are withdrawn.
    pub max_tool_rounds: u32,
    /// LLM generation options (temperature, max_tokens, etc.).
    pub generation_options: GenerationOptions,
    /// Text returned when the model produces neither content nor tool calls.
    pub fallback_message: String,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 5,
            generation_options: GenerationOptions::default(),
            fallback_message: FALLBACK_MESSAGE.into(),
        }
    }
}

impl LoopConfig {
    /// Limits from the agent section of the config.
    pub fn from_config(config: &AgentConfig, generation_options: GenerationOptions) -> Self {
        Self {
            max_tool_rounds: config.max_tool_rounds,
            generation_options,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// The result of executing a single tool call.
#[derive(Debug, Clone)]
pub struct ToolObservation {
    pub success: bool,
    pub content: String,
    pub duration_ms: u64,
}

/// How the loop finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model answered.
    Completed,
    /// The round bound was hit; the answer came from a call without tools.
    ToolLimitReached,
    /// The model returned neither content nor tool calls.
    EmptyResponse,
}

/// A finished request.
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// The final assistant text.
    pub text: String,
    pub outcome: LoopOutcome,
    /// Tool rounds executed.
    pub rounds: u32,
    /// Tool calls executed.
    pub tool_calls: u32,
    /// Accumulated token usage across all LLM calls.
    pub usage: Usage,
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Callback trait
// ---------------------------------------------------------------------------

/// Hooks into loop events (e.g. printing tool calls in the terminal).
/// Callbacks observe only; they cannot change control flow.
#[async_trait]
pub trait LoopCallback: Send + Sync {
    /// Called before each LLM call.
    async fn on_llm_call(&self, _round: u32, _tools_offered: bool) {}
    /// Called before a tool runs.
    async fn on_tool_call(&self, _tool_name: &str, _arguments: &str) {}
    /// Called after each individual tool has been executed.
    async fn on_tool_executed(&self, _tool_name: &str, _observation: &ToolObservation) {}
}

/// Default no-op callback.
pub struct NoOpCallback;

#[async_trait]
impl LoopCallback for NoOpCallback {}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Connects the LLM to the tool registry
#[derive(Clone)]
pub struct Agent {
    llm: Arc<dyn CompletionService>,
    tools: ToolRegistry,
    tool_definitions: Vec<ToolDefinition>,
    config: LoopConfig,
}

impl Agent {
    /// Create an agent
    pub fn new(llm: Arc<dyn CompletionService>, tools: ToolRegistry, config: LoopConfig) -> Self {
        let tool_definitions = tools.definitions();
        Agent {
            llm,
            tools,
            tool_definitions,
            config,
        }
    }

    /// Registered tools
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Model in use
    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Answer `message` within `session`.
    pub async fn respond(&self, session: &mut Session, message: &str) -> Result<String> {
        self.respond_with(session, message, &NoOpCallback)
            .await
            .map(|reply| reply.text)
    }

    /// Answer `message` within `session`, reporting progress to `callback`.
    pub async fn respond_with(
        &self,
        session: &mut Session,
        message: &str,
        callback: &dyn LoopCallback,
    ) -> Result<AgentReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidInput("Message is empty".to_string()));
        }

        let started = Instant::now();
        session.append(Turn::user(message));

        let mut pending: Vec<Turn> = Vec::new();
        let mut rounds: u32 = 0;
        let mut tool_calls_made: u32 = 0;
        let mut total_usage = Usage::default();

        let (text, outcome) = loop {
            let offer_tools =
                rounds < self.config.max_tool_rounds && !self.tool_definitions.is_empty();

            // Tools stay listed past the bound; only the choice changes
            let mut options = self.config.generation_options.clone();
            options.tool_choice = if offer_tools {
                ToolChoice::Auto
            } else {
                ToolChoice::None
            };

            let mut messages = session.api_messages();
            messages.extend(pending.iter().cloned());

            callback.on_llm_call(rounds + 1, offer_tools).await;
            debug!(
                "LLM call {} (messages={}, tools_offered={})",
                rounds + 1,
                messages.len(),
                offer_tools
            );

            let response = match self
                .llm
                .complete(messages, self.tool_definitions.clone(), options)
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("LLM call failed after {} tool rounds: {}", rounds, e);
                    return Err(e);
                }
            };

            if let Some(ref usage) = response.usage {
                accumulate_usage(&mut total_usage, usage);
            }

            let Some(reply) = response.first_message() else {
                warn!("LLM returned no choices");
                break (self.config.fallback_message.clone(), LoopOutcome::EmptyResponse);
            };

            let calls = reply.requested_calls();

            // --- Tool calls ----------------------------------------------
            if !calls.is_empty() && offer_tools {
                rounds += 1;
                info!(
                    "LLM requested {} tool calls (round {}/{})",
                    calls.len(),
                    rounds,
                    self.config.max_tool_rounds
                );

                pending.push(Turn::assistant_tool_calls(reply.content.clone(), calls.to_vec()));

                for call in calls {
                    tool_calls_made += 1;
                    let observation = self.run_tool(call, callback).await;
                    pending.push(Turn::tool(&call.id, &call.function.name, &observation.content));
                }

                if rounds >= self.config.max_tool_rounds {
                    warn!("{}; asking for a final answer", Error::ToolLoopLimitExceeded(rounds));
                }
                continue;
            }

            if !calls.is_empty() {
                debug!("Ignoring {} tool calls made without tools on offer", calls.len());
            }

            // --- Final answer --------------------------------------------
            let content = reply.content.trim();
            if content.is_empty() {
                warn!(
                    "LLM returned empty response, finish_reason: {}",
                    response
                        .choices
                        .first()
                        .and_then(|c| c.finish_reason.as_deref())
                        .unwrap_or("unknown")
                );
                break (self.config.fallback_message.clone(), LoopOutcome::EmptyResponse);
            }

            let outcome = if rounds > 0 && rounds >= self.config.max_tool_rounds {
                LoopOutcome::ToolLimitReached
            } else {
                LoopOutcome::Completed
            };
            break (content.to_string(), outcome);
        };

        session.extend(pending);
        session.append(Turn::assistant(&text));
        session.record_tokens(total_usage.total_tokens);

        let duration = started.elapsed();
        info!(
            "Agent finished: outcome={:?}, rounds={}, tool_calls={}, tokens={}, duration={}ms",
            outcome,
            rounds,
            tool_calls_made,
            total_usage.total_tokens,
            duration.as_millis(),
        );

        Ok(AgentReply {
            text,
            outcome,
            rounds,
            tool_calls: tool_calls_made,
            usage: total_usage,
            duration,
        })
    }

    async fn run_tool(
        &self,
        call: &AssistantToolCall,
        callback: &dyn LoopCallback,
    ) -> ToolObservation {
        let tool_name = call.function.name.as_str();
        callback.on_tool_call(tool_name, &call.function.arguments).await;
        debug!("Tool {} arguments: {}", tool_name, call.function.arguments);

        let tool_start = Instant::now();
        let (success, content) = match ToolCall::from_assistant(call) {
            Ok(parsed) => match self.tools.execute(&parsed).await {
                Ok(result) => (result.success, result.to_string()),
                Err(e) => (false, format!("Error: {}", e)),
            },
            Err(e) => (false, format!("Error: {}", e)),
        };
        let duration_ms = tool_start.elapsed().as_millis() as u64;

        if success {
            info!("Tool {} succeeded, result length: {} chars", tool_name, content.len());
        } else {
            warn!("Tool {} failed: {}", tool_name, content);
        }

        let observation = ToolObservation {
            success,
            content,
            duration_ms,
        };
        callback.on_tool_executed(tool_name, &observation).await;
        observation
    }
}

/// Sum token usage from one response into an accumulator.
fn accumulate_usage(total: &mut Usage, delta: &Usage) {
    total.prompt_tokens += delta.prompt_tokens;
    total.completion_tokens += delta.completion_tokens;
    total.total_tokens += delta.total_tokens;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
