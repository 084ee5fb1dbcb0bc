mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rebirth::config::RebirthConfig;

#[derive(Parser)]
#[command(name = "rebirth", version, about = "Talk with your younger self")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a conversation (runs onboarding on first launch)
    Chat,
    /// Show level, experience, and account status
    Status,
    /// Print the conversation history
    History {
        /// Only show the last N messages
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Export the local cache as JSON to stdout
    Export,
    /// Clear history, profile, and progress
    Reset,
    /// Run database diagnostics
    Doctor,
    /// Manage the account used to save progress
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Create an account and upload local progress
    Signup {
        #[arg(long)]
        email: String,
    },
    /// Sign in and sync progress
    Signin {
        #[arg(long)]
        email: String,
    },
    /// Sign out. Local progress is kept.
    Signout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = RebirthConfig::load()?;

    // stdout belongs to the conversation and to `export`.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Chat => cli::chat::chat(&config).await?,
        Command::Status => cli::status::status(&config)?,
        Command::History { limit } => cli::history::history(&config, limit)?,
        Command::Export => cli::export::export(&config)?,
        Command::Reset => cli::reset::reset(&config).await?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Auth { action } => match action {
            AuthAction::Signup { email } => cli::auth::signup(&config, &email).await?,
            AuthAction::Signin { email } => cli::auth::signin(&config, &email).await?,
            AuthAction::Signout => cli::auth::signout(&config).await?,
        },
    }

    Ok(())
}
