//! # SearchAgent
//!
//! A chat agent that answers questions with live web search, usable from a
//! terminal or a browser.
//!
//! ## Features
//!
//! - **OpenAI-compatible LLM access:** OpenRouter by default, any compatible endpoint
//! - **Web search tools:** Google Custom Search with domain and date filters
//! - **Page excerpts:** bounded plain-text extraction from result pages
//! - **Sessions:** bounded per-user transcripts with idle expiry
//! - **Two front ends:** interactive terminal and an HTTP chat server

pub mod agent;
pub mod config;
pub mod error;
pub mod logging;
pub mod search;
pub mod tools;
pub mod web;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
