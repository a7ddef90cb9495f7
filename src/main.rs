//! Kavira - Voice-capable AI chat CLI
//!
//! Main entry point: parses arguments, loads configuration, and
//! dispatches to the chat loop or the one-shot subcommands.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kavira::cli::{Cli, Commands};
use kavira::commands;
use kavira::config::Config;
use kavira::session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;
    config.validate()?;

    // Initialize tracing
    init_tracing(&config.logging.directive(cli.verbose));

    // Execute command
    match cli.command {
        Commands::Chat { mode } => {
            if let Some(m) = &mode {
                tracing::debug!("Using mode override: {}", m);
            }
            commands::chat::run_chat(config, mode).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            let store = SessionStore::open_default()?;
            commands::sessions::handle_sessions(command, &store)?;
            Ok(())
        }
        Commands::Imagine { prompt, output } => {
            commands::media::imagine(config, prompt, output).await?;
            Ok(())
        }
        Commands::Speak { text } => {
            commands::media::speak(config, text).await?;
            Ok(())
        }
        Commands::Listen { output } => {
            commands::media::listen(config, output).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` still wins when set; `default_filter` comes from the
/// configuration file (or `--verbose`).
fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
