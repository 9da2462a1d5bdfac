//! Search Agent - command-line entry point
//!
//! Runs the agent as an interactive REPL, a one-shot question, or an HTTP
//! server.

use clap::{Parser, Subcommand};
use search_agent::{
    agent::{Agent, ConversationHistory},
    api, repl,
    config::Config,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "search-agent", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Chat interactively on the terminal (default)
    Chat,
    /// Ask a single question and print the answer
    Ask { question: String },
    /// Serve the HTTP API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "search_agent=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration: model={}", config.agent.completion.model);

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            let agent = Agent::new(&config);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            repl::run(&agent, stdin, tokio::io::stdout()).await?;
        }
        Command::Ask { question } => {
            let agent = Agent::new(&config);
            let mut history = ConversationHistory::new();
            let output = agent.run_turn(&mut history, &question).await;
            println!("{}", output.answer);
        }
        Command::Serve => {
            info!("Starting server on {}:{}", config.host, config.port);
            api::serve(config).await?;
        }
    }

    Ok(())
}
