//! Sales bot for RKL collections.
//!
//! This binary polls the marketplace for completed sales of the configured
//! collections and announces new ones on Discord and Twitter.

mod bot;
mod config;
mod error;

use clap::Parser;
use std::process::exit;
use tracing::{error, info};

use bot::SalesBot;
use config::{CliConfig, EnvConfig};

#[tokio::main]
async fn main() {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    // Parse environment configuration
    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    // Parse CLI arguments
    let cli_config = CliConfig::parse();

    let run_config = match cli_config.to_run_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            exit(1);
        }
    };
    let cooldown = run_config.cooldown;

    // Set up logging
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bot = SalesBot::new(env_config, run_config);

    let tasks = match bot.spawn() {
        Ok(tasks) => tasks,
        Err(e) => {
            eprintln!("Failed to start sales bot: {}", e);
            exit(1);
        }
    };

    tokio::select! {
        result = bot::supervise(tasks) => {
            if let Err(e) = result {
                error!(%e, cooldown = ?cooldown, "Sales bot encountered an error, cooling down before exit");
                tokio::time::sleep(cooldown).await;
            }
            exit(1);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }
}
