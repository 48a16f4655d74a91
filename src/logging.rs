//! Tracing subscriber setup shared by both binaries

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Which front end is installing the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Interactive terminal: quiet, no timestamps, stderr only
    Terminal,
    /// Long-running server
    Server,
}

/// Build the env filter. `RUST_LOG` (already folded into `LogConfig`)
/// wins; an unparseable directive falls back to the default level.
pub fn build_filter(config: &LogConfig, target: LogTarget) -> EnvFilter {
    let level = match target {
        LogTarget::Terminal if config.level == LogConfig::default().level => {
            "warn,searchagent=warn"
        }
        _ => config.level.as_str(),
    };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(config: &LogConfig, target: LogTarget) {
    let filter = build_filter(config, target);

    let result = match (target, config.format.as_str()) {
        (LogTarget::Terminal, _) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .try_init(),
        (LogTarget::Server, "json") => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
        (LogTarget::Server, _) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("Tracing subscriber already installed: {}", e);
    }
}
