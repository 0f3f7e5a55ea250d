// ============================================
// File: crates/pairgate-server/src/main.rs
// ============================================
//! # Pairgate Server Entry Point
//!
//! ## Creation Reason
//! Main entry point for the pairing server binary.
//! Handles CLI parsing, logging setup, and server initialization.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading and validation
//! - Server execution
//!
//! ## Usage
//! ```bash
//! pairgate-server start -c /etc/pairgate/server.toml
//! pairgate-server validate -c /etc/pairgate/server.toml
//!
//! # More detail than the configured level
//! RUST_LOG=pairgate_server=debug pairgate-server start
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A missing config file is not an error, defaults are used
//! - `RUST_LOG` overrides `[logging] level`
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pairgate_server::{Server, ServerConfig};

const DEFAULT_CONFIG: &str = "/etc/pairgate/server.toml";

// ============================================
// CLI Definition
// ============================================

/// Pairgate gateway pairing and authentication server
#[derive(Parser, Debug)]
#[command(name = "pairgate-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the server
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start { config } => cmd_start(config).await,
        Commands::Validate { config } => cmd_validate(config).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Starts the server.
async fn cmd_start(config_path: PathBuf) -> anyhow::Result<()> {
    let config = load_or_default_config(&config_path).await?;

    init_logging(&config.logging.level);
    if !config_path.exists() {
        info!("Config file {} not found, using defaults", config_path.display());
    }

    let server = Server::new(config);
    server.run().await?;

    Ok(())
}

/// Validates configuration file.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    init_logging("warn");

    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Server will use default values.");
        return Ok(());
    }

    let config = ServerConfig::load(&config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Network:");
    println!("   Listen:           {}", config.listen_addr());
    println!();
    println!("Limits:");
    println!("   Queue capacity:   {}", config.limits.channel_capacity);
    println!("   Write timeout:    {} ms", config.limits.write_timeout_ms);
    println!("   Write retries:    {}", config.limits.write_retries);
    println!();
    println!("Logging:             {}", config.logging.level);
    println!("Console:             {}", if config.console.enabled { "enabled" } else { "disabled" });
    println!("Startup scans:       {}", config.scans.len());

    Ok(())
}

// ============================================
// Helpers
// ============================================

async fn load_or_default_config(path: &Path) -> anyhow::Result<ServerConfig> {
    if path.exists() {
        Ok(ServerConfig::load(path).await?)
    } else {
        Ok(ServerConfig::default())
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
