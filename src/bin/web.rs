//! SearchAgent Web - Browser chat server
//!
//! Serves the embedded chat page and its JSON API. Sessions live in
//! memory and are dropped after sitting idle.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use searchagent::agent::{MemorySessionStore, Runtime};
use searchagent::config::{validate_config, Config};
use searchagent::logging::{self, LogTarget};
use searchagent::web::{build_router, AppState};

/// SearchAgent Web - browser chat with live web search
#[derive(Parser, Debug)]
#[command(name = "searchagent-web")]
#[command(about = "Web chat interface for SearchAgent")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(model) = args.model {
        config.llm.model = model;
    }
    if let Some(bind) = args.bind {
        config.web.bind = bind;
    }
    if let Some(port) = args.port {
        config.web.port = port;
    }

    logging::init(&config.log, LogTarget::Server);

    for warning in validate_config(&config).into_result()? {
        warn!("Config: {}", warning);
    }

    let runtime = Runtime::from_config(&config).context("Failed to initialize agent")?;

    let sessions = MemorySessionStore::new(
        config.web.max_sessions,
        config.web.session_idle_timeout,
        config.agent.max_history_turns,
    )
    .with_system_prompt(runtime.system_prompt);

    let state = AppState {
        agent: Arc::new(runtime.agent),
        sessions: Arc::new(sessions),
        help_text: Arc::from(runtime.help_text),
        request_timeout: config.web.request_timeout,
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.web.bind, config.web.port);
    info!("SearchAgent web chat on http://{} (model: {})", addr, config.llm.model);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
