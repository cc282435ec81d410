//! Concierge CLI — the main entry point.
//!
//! Commands:
//! - `onboard`    — Write a starter config file
//! - `chat`       — Interactive chat or single-message mode
//! - `transcript` — Show the displayable conversation transcript
//! - `compact`    — Collapse a user's history into a summary
//! - `remind`     — Run the reminder sweep once or continuously

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "concierge",
    about = "Concierge — conversational personal assistant with task and contact memory",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Onboard,

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Acting user id
        #[arg(short, long, default_value_t = 1)]
        user: i64,
    },

    /// Show the displayable conversation transcript
    Transcript {
        /// Acting user id
        #[arg(short, long, default_value_t = 1)]
        user: i64,

        /// Most recent turns to show
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Collapse conversation history into a compact summary
    Compact {
        /// Acting user id
        #[arg(short, long, default_value_t = 1)]
        user: i64,
    },

    /// Run the reminder sweep
    Remind {
        /// Keep running on a fixed delay instead of sweeping once
        #[arg(short, long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { message, user } => commands::chat::run(message, user).await?,
        Commands::Transcript { user, limit } => commands::transcript::run(user, limit).await?,
        Commands::Compact { user } => commands::compact::run(user).await?,
        Commands::Remind { watch } => commands::remind::run(watch).await?,
    }

    Ok(())
}
