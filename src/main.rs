//! repochat - chat with an LLM about your GitHub repositories

use clap::{Parser, Subcommand};
use colored::*;
use repochat::{
    config::ConfigManager,
    server,
    session::ChatSession,
    ui::{ConsoleChat, HttpChatBackend},
    utils::errors::RepoChatError,
    utils::http::HttpClient,
    Result,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// repochat: browse GitHub repositories and ask an LLM about them
#[derive(Parser)]
#[command(name = "repochat")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Bind address, overrides configuration
        #[arg(long)]
        host: Option<String>,
        /// Port, overrides configuration and PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Interactive console chat against a running server
    Chat {
        /// Server base URL
        #[arg(short, long, default_value = "http://localhost:3000")]
        server: String,
        /// GitHub OAuth token
        #[arg(short, long, env = "GITHUB_TOKEN")]
        token: Option<String>,
        /// Repository to open, as <owner>/<repo>
        #[arg(short, long)]
        repo: Option<String>,
        /// Session id for server-side history
        #[arg(long)]
        session: Option<String>,
    },
    /// Check configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let command = cli.command.clone().unwrap_or(Commands::Serve {
        host: None,
        port: None,
    });

    let result = match command {
        Commands::Serve { host, port } => run_server(cli.config, host, port).await,
        Commands::Chat {
            server,
            token,
            repo,
            session,
        } => run_console_chat(server, token, repo, session).await,
        Commands::Status => show_status(cli.config),
    };

    if let Err(e) = &result {
        error!(category = e.category(), "{}", e);
    }
    result
}

/// Initialize logging
fn init_logging(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level)
        .map_err(|e| RepoChatError::unknown(format!("Invalid log level: {}", e)))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| RepoChatError::unknown(format!("Failed to set logger: {}", e)))?;

    Ok(())
}

async fn run_server(config_path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = ConfigManager::new(config_path)?.into_config();
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    info!("Starting {} v{}", repochat::APP_NAME, repochat::VERSION);
    server::serve(&config).await
}

async fn run_console_chat(
    server: String,
    token: Option<String>,
    repo: Option<String>,
    session: Option<String>,
) -> Result<()> {
    let http = HttpClient::with_defaults()?;
    let backend = HttpChatBackend::new(http.client().clone(), &server, token)?;
    let session = session.map(ChatSession::new).unwrap_or_else(ChatSession::random);

    let mut console = ConsoleChat::new(backend, session);
    console.run(repo).await
}

fn show_status(config_path: Option<PathBuf>) -> Result<()> {
    let manager = ConfigManager::new(config_path)?;
    let config = manager.config();

    println!("{}", format!("{} v{}", repochat::APP_NAME, repochat::VERSION).bright_green().bold());

    println!("\n{}", "Configuration:".bright_cyan().bold());
    match manager.config_path() {
        Some(path) => println!("   File: {}", path.display()),
        None => println!("   File: none (defaults and environment)"),
    }
    if let Some(default) = ConfigManager::default_config_path() {
        println!("   Default location: {}", default.display());
    }

    println!("\n{}", "Validation:".bright_cyan().bold());
    match config.validate() {
        Ok(()) => println!("   Status: {}", "Valid".bright_green()),
        Err(e) => {
            println!("   Status: {}", "Incomplete".bright_yellow());
            println!("   {}", e);
            for key in config.missing_credentials() {
                println!("     • missing {}", key);
            }
        }
    }

    println!("\n{}", "Effective settings:".bright_cyan().bold());
    for line in config.masked().to_toml()?.lines() {
        println!("   {}", line);
    }

    Ok(())
}
