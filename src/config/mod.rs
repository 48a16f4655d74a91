//! Configuration module
//!
//! Configuration is split into focused modules:
//! - types.rs: Configuration types (Config, LlmConfig, SearchConfig, ...)
//! - io.rs: Configuration loading (file + environment)
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths
//!
//! A `Config` is built once at startup and handed to the components that
//! need it.

mod io;
mod paths;
mod types;
mod validation;

pub use types::{
    AgentConfig, Config, FetchConfig, LlmConfig, LogConfig, SearchConfig, WebConfig,
};

pub use io::{
    apply_env_overrides, apply_overrides_from, load_config, load_config_from_path,
    load_config_layered,
};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
