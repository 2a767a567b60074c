//! toolchat - tool-augmented chat for local LLMs
//!
//! Main entry point: serves the chat endpoint or runs a single prompt.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use toolchat::{Config, Message, Orchestrator};

/// toolchat - tool-augmented chat for local LLMs
#[derive(Parser, Debug)]
#[command(name = "toolchat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to chat with
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// MCP server URL (Streamable HTTP)
    #[arg(long)]
    mcp_url: Option<String>,

    /// Maximum backend round-trips per request
    #[arg(long)]
    max_turns: Option<usize>,

    /// Port for the chat endpoint
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Tool to offer in single prompt mode (repeatable)
    #[arg(long = "tool", short = 't')]
    tools: Vec<String>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn init_logging(debug: bool) {
    let default = if debug { "toolchat=debug" } else { "toolchat=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    if args.print_config {
        println!("{}", Config::default_config_toml());
        return Ok(());
    }

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(model) = args.model {
        config.model.name = model;
    }
    if let Some(url) = args.mcp_url {
        config.tools.server_url = Some(url);
    }
    if let Some(max_turns) = args.max_turns {
        config.agent.max_turns = max_turns;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let orchestrator = Orchestrator::from_config(&config)?;

    if let Err(e) = orchestrator.check_model(&config.model.name).await {
        tracing::warn!("{}", e);
    }

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let result = orchestrator
            .run(vec![Message::user(prompt)], &args.tools)
            .await?;

        println!("{}", result.final_text);
        if !result.tools_used.is_empty() {
            eprintln!("tools used: {}", result.tools_used.join(", "));
        }
        if result.truncated {
            eprintln!("(stopped at the tool loop limit)");
        }
        return Ok(());
    }

    let addr = config.server_addr()?;
    toolchat::server::serve(addr, Arc::new(orchestrator), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {}", e);
        }
        tracing::info!("shutting down");
    })
    .await?;

    Ok(())
}
