//! CLI command definitions and dispatch.

pub mod admin;
pub mod migrate;
pub mod token;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use securedrop_core::config::AppConfig;
use securedrop_core::error::AppError;
use securedrop_database::{DatabasePool, SqlitePool};

/// SecureDrop Exchange administration
#[derive(Debug, Parser)]
#[command(name = "securedrop-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Administrator accounts
    Admin(admin::AdminArgs),
    /// Access tokens
    Token(token::TokenArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config).await,
            Commands::Admin(args) => admin::execute(args, &self.config).await,
            Commands::Token(args) => token::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    tracing::debug!(path = config_path, "Loading configuration");
    AppConfig::load_from(config_path)
}

/// Helper: connect to the database and bring the schema up to date
pub async fn create_db_pool(config: &AppConfig) -> Result<SqlitePool, AppError> {
    let pool = DatabasePool::connect(&config.database).await?.into_pool();
    securedrop_database::migration::run_migrations(&pool).await?;
    Ok(pool)
}

/// Helper: map prompt failures into the application error type
pub fn input_error(err: dialoguer::Error) -> AppError {
    AppError::internal(format!("Input error: {err}"))
}
