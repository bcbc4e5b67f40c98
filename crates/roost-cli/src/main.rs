//! # roost-cli
//!
//! Command-line interface for Roost.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use roost_core::Config;

mod commands;

/// Roost - unattended bot fleet manager
#[derive(Parser)]
#[command(name = "roost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the store directory
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run bots in the foreground until ctrl-c
    Run {
        /// Bot usernames to start (all stored accounts when empty)
        names: Vec<String>,
    },
    /// Account management
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },
    /// Fleet settings management
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum AccountsAction {
    /// List stored accounts
    List,
    /// Add or update an account
    Add {
        /// Bot username
        username: String,
        /// Password for authenticated servers
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Remove an account
    Remove {
        /// Bot username
        username: String,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show effective settings
    Show,
    /// Upgrade settings from an older layout and persist the result
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load configuration
    let mut config = Config::load_validated().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    if cli.data_dir.is_some() {
        config.general.data_dir = cli.data_dir.clone();
    }

    match cli.command {
        Commands::Run { names } => {
            commands::run::handle(&config, names).await?;
        }
        Commands::Accounts { action } => {
            commands::accounts::handle(&config, action).await?;
        }
        Commands::Settings { action } => {
            commands::settings::handle(&config, action).await?;
        }
        Commands::Version => {
            println!("roost {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
