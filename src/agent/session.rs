//! Conversation sessions and the session store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::agent::types::{Role, Turn};

/// A bounded conversation transcript for one user
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session id
    pub id: String,
    /// Ordered transcript
    turns: Vec<Turn>,
    /// System prompt, kept out of the transcript
    system_prompt: Option<String>,
    /// Maximum number of turns kept
    max_turns: usize,
    /// When the session started
    pub created_at: DateTime<Utc>,
    /// When the session was last updated
    pub updated_at: DateTime<Utc>,
    /// Total tokens used across requests
    pub total_tokens: u64,
}

impl Session {
    /// Create an empty session keeping at most `max_turns` turns
    pub fn new(id: impl Into<String>, max_turns: usize) -> Self {
        let now = Utc::now();
        Session {
            id: id.into(),
            turns: Vec::new(),
            system_prompt: None,
            max_turns: max_turns.max(1),
            created_at: now,
            updated_at: now,
            total_tokens: 0,
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// The system prompt, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Append a turn, dropping the oldest turns past the bound
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.enforce_bound();
        self.updated_at = Utc::now();
    }

    /// Append several turns in order
    pub fn extend(&mut self, turns: impl IntoIterator<Item = Turn>) {
        for turn in turns {
            self.append(turn);
        }
    }

    /// The transcript, oldest first
    pub fn transcript(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns formatted for an API request (system prompt first)
    pub fn api_messages(&self) -> Vec<Turn> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);

        if let Some(ref system) = self.system_prompt {
            messages.push(Turn::system(system));
        }

        messages.extend(self.turns.iter().cloned());
        messages
    }

    /// Empty the transcript
    pub fn clear(&mut self) {
        self.turns.clear();
        self.updated_at = Utc::now();
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the transcript is empty
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turn bound
    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Get the last assistant turn, if any
    pub fn last_assistant_turn(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.role == Role::Assistant)
    }

    /// Add provider token usage
    pub fn record_tokens(&mut self, tokens: u32) {
        self.total_tokens += u64::from(tokens);
    }

    fn enforce_bound(&mut self) {
        while self.turns.len() > self.max_turns {
            let oldest = self
                .turns
                .iter()
                .position(|t| t.role != Role::System)
                .unwrap_or(0);
            self.turns.remove(oldest);
        }

        // Tool results whose requesting assistant turn was dropped
        while let Some(idx) = self.turns.iter().position(|t| t.role != Role::System) {
            if self.turns[idx].role == Role::Tool {
                self.turns.remove(idx);
            } else {
                break;
            }
        }
    }
}

/// A session shared between requests; hold the lock for a whole request
pub type SharedSession = Arc<Mutex<Session>>;

/// Maps session ids to sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up `id`, creating the session if it is missing. A missing or
    /// empty id gets a fresh one. Returns the id actually used.
    async fn get_or_create(&self, id: Option<&str>) -> (String, SharedSession);

    /// Look up an existing session
    async fn get(&self, id: &str) -> Option<SharedSession>;

    /// Drop a session
    async fn remove(&self, id: &str);

    /// Number of live sessions
    async fn count(&self) -> u64;
}

/// In-memory store with idle expiry and a capacity cap
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Cache<String, SharedSession>,
    max_turns: usize,
    system_prompt: Option<String>,
}

impl MemorySessionStore {
    /// Create a store. Sessions idle for `idle_timeout` are dropped.
    pub fn new(max_sessions: u64, idle_timeout: Duration, max_turns: usize) -> Self {
        let sessions = Cache::builder()
            .max_capacity(max_sessions)
            .time_to_idle(idle_timeout)
            .build();

        MemorySessionStore {
            sessions,
            max_turns,
            system_prompt: None,
        }
    }

    /// System prompt given to new sessions
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    fn new_session(&self, id: &str) -> SharedSession {
        let mut session = Session::new(id, self.max_turns);
        if let Some(ref prompt) = self.system_prompt {
            session = session.with_system_prompt(prompt);
        }
        Arc::new(Mutex::new(session))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_or_create(&self, id: Option<&str>) -> (String, SharedSession) {
        let id = id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let session = self
            .sessions
            .get_with(id.clone(), async { self.new_session(&id) })
            .await;
        (id, session)
    }

    async fn get(&self, id: &str) -> Option<SharedSession> {
        self.sessions.get(id).await
    }

    async fn remove(&self, id: &str) {
        self.sessions.invalidate(id).await;
    }

    async fn count(&self) -> u64 {
        self.sessions.run_pending_tasks().await;
        self.sessions.entry_count()
    }
}
