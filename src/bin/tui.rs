//! SearchAgent TUI - Interactive Terminal Interface
//!
//! A REPL over the agent: free text goes to the model, which may search
//! the web before answering. The transcript lives for the process only.

use searchagent::agent::{LoopCallback, Role, Runtime, Session, ToolObservation};
use searchagent::config::{validate_config, Config};
use searchagent::logging::{self, LogTarget};

use async_trait::async_trait;
use clap::Parser;
use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Input};
use std::time::Instant;
use tracing::warn;

/// SearchAgent - chat with live web search
#[derive(Parser, Debug)]
#[command(name = "searchagent")]
#[command(about = "Interactive terminal chat with live web search")]
#[command(version)]
struct Args {
    /// Model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Show full tool arguments
    #[arg(short, long)]
    verbose: bool,
}

/// A line typed at the prompt
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Help,
    Clear,
    Tools,
    History,
    Exit,
    Message(&'a str),
}

impl<'a> Command<'a> {
    /// Commands are case-insensitive and may start with `/`
    fn parse(input: &'a str) -> Self {
        let input = input.trim();
        match input.trim_start_matches('/').to_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "clear" => Command::Clear,
            "tools" => Command::Tools,
            "history" => Command::History,
            "exit" | "quit" | "q" => Command::Exit,
            _ => Command::Message(input),
        }
    }
}

/// Prints tool activity while the agent works
struct TerminalCallback {
    verbose: bool,
}

#[async_trait]
impl LoopCallback for TerminalCallback {
    async fn on_tool_call(&self, tool_name: &str, arguments: &str) {
        println!("   {}", format_tool_call(tool_name, arguments, self.verbose));
    }

    async fn on_tool_executed(&self, _tool_name: &str, observation: &ToolObservation) {
        let mark = if observation.success {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!(
            "   {} {} {}",
            mark,
            preview(&observation.content, 120),
            style(format!("({}ms)", observation.duration_ms)).dim()
        );
    }
}

fn theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

fn print_banner() {
    println!();
    println!("{}", style("╔══════════════════════════════════════════════════════════════╗").cyan());
    println!("{}", style("║          🔍 SearchAgent - Chat with Live Web Search          ║").cyan());
    println!("{}", style("╚══════════════════════════════════════════════════════════════╝").cyan());
    println!();
}

fn print_tools(runtime: &Runtime) {
    let tools = runtime.agent.tools();
    println!();
    println!("   {} {} tools available:", style("🛠").bold(), tools.count());
    println!();
    for (name, description) in tools.descriptions() {
        println!("   {} {}", style("•").cyan(), style(&name).green().bold());
        println!("     {}", style(description).dim());
    }
    println!();
}

fn print_history(session: &Session) {
    println!();
    println!("   {}", style("Conversation History:").cyan().bold());
    println!();

    let mut count = 0;
    for turn in session.transcript() {
        count += 1;
        let role = turn.role.to_string();
        let role_style = match turn.role {
            Role::User => style(role).green().bold(),
            Role::Assistant => style(role).cyan().bold(),
            Role::Tool => style(role).yellow().bold(),
            Role::System => style(role).dim(),
        };
        let content = if turn.content.is_empty() && !turn.requested_calls().is_empty() {
            let names: Vec<&str> = turn
                .requested_calls()
                .iter()
                .map(|c| c.function.name.as_str())
                .collect();
            format!("(calls {})", names.join(", "))
        } else {
            preview(&turn.content, 100)
        };
        println!("   {} [{}]: {}", style(format!("{:02}", count)).dim(), role_style, content);
    }

    if count == 0 {
        println!("   {}", style("(empty)").dim());
    }
    println!();
}

/// First `max` characters on one line
fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max {
        let cut: String = flat.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

/// One line describing a tool call
fn format_tool_call(name: &str, arguments: &str, verbose: bool) -> String {
    let args: serde_json::Value = serde_json::from_str(arguments).unwrap_or_default();

    if verbose {
        let pretty = serde_json::to_string_pretty(&args).unwrap_or_else(|_| arguments.to_string());
        return format!("🔍 {}\n{}", style(name).yellow().bold(), style(pretty).dim());
    }

    let query = args
        .get("query")
        .and_then(|v| v.as_str())
        .map(|q| format!("\"{}\"", q))
        .unwrap_or_default();
    format!("🔍 {} {}", style(name).yellow().bold(), style(query).dim())
}

/// Main REPL loop
async fn run_repl(runtime: Runtime, mut session: Session, verbose: bool) -> anyhow::Result<()> {
    print_banner();

    println!("   {} Model: {}", style("✓").green(), style(runtime.agent.model()).cyan());
    println!("   {} Tools: {} available", style("✓").green(), runtime.agent.tools().count());
    println!();
    println!("   Type {} for available commands.", style("help").yellow());
    println!();

    let callback = TerminalCallback { verbose };

    loop {
        let user_input: String = match Input::with_theme(&theme())
            .with_prompt(style("You").green().bold().to_string())
            .allow_empty(true)
            .interact_text()
        {
            Ok(input) => input,
            Err(e) => {
                if e.to_string().contains("interrupted") {
                    println!("\n{} Goodbye!\n", style("👋").bold());
                    break;
                }
                eprintln!("Input error: {}", e);
                continue;
            }
        };

        if user_input.trim().is_empty() {
            continue;
        }

        match Command::parse(&user_input) {
            Command::Exit => {
                println!("\n{} Goodbye!\n", style("👋").bold());
                break;
            }
            Command::Help => {
                println!();
                for line in runtime.help_text.lines() {
                    println!("   {}", line);
                }
                println!();
            }
            Command::Clear => {
                session.clear();
                let _ = Term::stdout().clear_screen();
                print_banner();
                println!("   {} Conversation history cleared.\n", style("✓").green());
            }
            Command::Tools => print_tools(&runtime),
            Command::History => print_history(&session),
            Command::Message(message) => {
                let started = Instant::now();
                println!("   {}", style("●●● searching and thinking").dim());

                match runtime.agent.respond_with(&mut session, message, &callback).await {
                    Ok(reply) => {
                        println!();
                        println!("   {}: {}", style("Agent").cyan().bold(), reply.text);
                        println!();
                        let elapsed = started.elapsed().as_secs_f64();
                        println!(
                            "   {}",
                            style(format!("Response time: {:.2}s", elapsed)).dim()
                        );
                        println!();
                    }
                    Err(e) => {
                        warn!("Request failed: {}", e);
                        println!();
                        println!("   {} An error occurred: {}", style("❌").red(), e);
                        println!();
                    }
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(model) = args.model {
        config.llm.model = model;
    }

    logging::init(&config.log, LogTarget::Terminal);

    for warning in validate_config(&config).into_result()? {
        println!("   {} {}", style("⚠").yellow(), warning);
    }

    let runtime = Runtime::from_config(&config)?;
    let session = Session::new("terminal", config.agent.max_history_turns)
        .with_system_prompt(runtime.system_prompt.clone());

    run_repl(runtime, session, args.verbose).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("help"), Command::Help);
        assert_eq!(Command::parse("/CLEAR"), Command::Clear);
        assert_eq!(Command::parse(" q "), Command::Exit);
        assert_eq!(Command::parse("/quit"), Command::Exit);
        assert_eq!(Command::parse("history"), Command::History);
        assert_eq!(Command::parse("tools"), Command::Tools);
        assert_eq!(Command::parse(" what is rust? "), Command::Message("what is rust?"));
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("héllo\nwörld", 100), "héllo wörld");
        assert_eq!(preview("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_format_tool_call_shows_query() {
        let line = format_tool_call("search", r#"{"query":"rust 1.80"}"#, false);
        assert!(line.contains("\"rust 1.80\""));
    }
}
