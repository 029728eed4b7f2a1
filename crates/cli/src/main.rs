//! Bentofolio CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a default config file
//! - `pack`: Pack a list of card sizes and draw the grid
//! - `layout`: Layout of every section of the stored portfolio
//! - `export`: Write the portfolio as a standalone HTML page
//! - `chat`: Edit the portfolio through the assistant
//! - `serve`: Start the HTTP editor API
//! - `status`: Show configuration, storage and quota
//! - `config`: Show, locate or validate the config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "bentofolio",
    about = "Bentofolio: bento-grid portfolio editor with an AI assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file to use instead of ~/.bentofolio/config.toml
    #[arg(short, long, global = true, env = "BENTOFOLIO_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create the data directories
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Pack card sizes (e.g. `2x2 1x1 2x1`) and print the result
    Pack {
        /// Card sizes as WxH
        #[arg(required = true)]
        sizes: Vec<String>,

        /// Column count; resolved from --width when absent
        #[arg(long)]
        columns: Option<u32>,

        /// Container width in pixels
        #[arg(long)]
        width: Option<f64>,

        #[arg(long, default_value_t = 4)]
        max_columns: u32,

        #[arg(long, default_value_t = 8.0)]
        gap: f64,
    },

    /// Show the packed layout of every stored section
    Layout {
        /// Container width in pixels; uses the configured column count when absent
        #[arg(long)]
        width: Option<f64>,
    },

    /// Export the stored portfolio to a standalone HTML file
    Export {
        /// Output file
        #[arg(short, long, default_value = "portfolio.html")]
        output: PathBuf,

        /// Document title
        #[arg(long)]
        title: Option<String>,
    },

    /// Chat with the portfolio assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the HTTP editor API
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show configuration, storage and quota status
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Check the configuration for errors
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force).await?,
        Commands::Pack { sizes, columns, width, max_columns, gap } => {
            commands::pack::run(&sizes, columns, width, max_columns, gap)?
        }
        Commands::Layout { width } => commands::layout::run(config_path, width).await?,
        Commands::Export { output, title } => commands::export::run(config_path, &output, title).await?,
        Commands::Chat { message } => commands::chat::run(config_path, message).await?,
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Status => commands::status::run(config_path).await?,
        Commands::Config { command } => match command {
            ConfigCommand::Show => commands::config_cmd::show(config_path).await?,
            ConfigCommand::Path => commands::config_cmd::path(config_path).await?,
            ConfigCommand::Validate => commands::config_cmd::validate(config_path).await?,
        },
    }

    Ok(())
}
