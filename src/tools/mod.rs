//! Tools module - tools the model can call
//!
//! Each tool implements the `Tool` trait and is registered into a
//! `ToolRegistry`, which checks arguments against the tool's JSON schema
//! before dispatching.
//!
//! ## Built-in Tools
//!
//! - **search**: web search with comma-separated site filters
//! - **advanced_search**: web search with domain lists and a date range

mod registry;
mod search;
mod traits;

// Core trait and types
pub use traits::{Tool, ToolCall, ToolResult};

// Registry
pub use registry::{validate_arguments, ToolRegistry};

// Built-in tools
pub use search::{format_results, simplify_query, AdvancedSearchTool, SearchBackend, SearchTool};

/// Registry holding both search tools over one backend
pub fn search_registry(backend: SearchBackend) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(SearchTool::new(backend.clone()));
    registry.register(AdvancedSearchTool::new(backend));
    registry
}
