//! Admin account management commands.

use std::sync::Arc;

use clap::{Args, Subcommand};

use securedrop_auth::{JwtDecoder, JwtEncoder, PasswordHasher, PasswordValidator};
use securedrop_core::config::AppConfig;
use securedrop_core::error::{AppError, ErrorKind};
use securedrop_database::SqlitePool;
use securedrop_database::repositories::AdminRepository;
use securedrop_service::AdminAuthService;

use crate::output;

/// Arguments for admin commands
#[derive(Debug, Args)]
pub struct AdminArgs {
    /// Admin subcommand
    #[command(subcommand)]
    pub command: AdminCommand,
}

/// Admin subcommands
#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Create an administrator; skips if the name is taken
    Create {
        /// Username
        #[arg(short, long)]
        username: Option<String>,
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Reset an administrator's password
    ResetPassword {
        /// Username of the admin
        #[arg(short, long)]
        username: String,
        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
}

/// Execute admin commands
pub async fn execute(args: &AdminArgs, config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;
    let admins = admin_service(&config, pool);

    match &args.command {
        AdminCommand::Create { username, password } => {
            let username = match username {
                Some(u) => u.clone(),
                None => dialoguer::Input::new()
                    .with_prompt("Admin username")
                    .interact_text()
                    .map_err(super::input_error)?,
            };
            let password = match password {
                Some(p) => p.clone(),
                None => prompt_password("Admin password")?,
            };

            match admins.create_admin(&username, &password).await {
                Ok(admin) => output::print_success(&format!(
                    "Admin '{}' created (id: {})",
                    admin.username, admin.id
                )),
                Err(e) if e.kind == ErrorKind::Conflict => {
                    output::print_warning(&format!("Admin '{username}' already exists, skipping"))
                }
                Err(e) => return Err(e),
            }
        }
        AdminCommand::ResetPassword { username, password } => {
            let password = match password {
                Some(p) => p.clone(),
                None => prompt_password("New password")?,
            };

            admins.reset_password(username, &password).await?;
            output::print_success(&format!("Password reset for admin '{username}'"));
        }
    }

    Ok(())
}

fn admin_service(config: &AppConfig, pool: SqlitePool) -> AdminAuthService {
    AdminAuthService::new(
        Arc::new(AdminRepository::new(pool)),
        Arc::new(PasswordHasher::new()),
        Arc::new(PasswordValidator::new(&config.auth)),
        Arc::new(JwtEncoder::new(&config.auth, &config.session)),
        Arc::new(JwtDecoder::new(&config.auth)),
    )
}

fn prompt_password(prompt: &str) -> Result<String, AppError> {
    dialoguer::Password::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map_err(super::input_error)
}
