//! Biosync CLI - Main entry point

use biosync_cli::{api::ApiClient, commands, Cli, Commands};
use biosync_common::logging::{init_logging, LogConfig, LogLevel};
use clap::Parser;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbose flag and environment
    let log_config = if cli.verbose {
        LogConfig::default()
            .with_level(LogLevel::Debug)
            .with_file_prefix("biosync-cli")
    } else {
        LogConfig::default()
            .with_level(LogLevel::Warn)
            .with_file_prefix("biosync-cli")
    };

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    // Initialize logging (ignore errors as the CLI should work without it)
    let _ = init_logging(&log_config);

    // Execute command
    let client = ApiClient::new(&cli.server);
    let result = match cli.command {
        Commands::Sync {
            database_id,
            tables,
            full,
        } => commands::sync::run(&client, database_id, tables, full).await,
        Commands::Status { database_id } => commands::status::run(&client, database_id).await,
        Commands::History { database_id, limit } => {
            commands::history::run(&client, database_id, limit).await
        },
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
