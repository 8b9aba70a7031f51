//! Admin login, bearer verification and account bootstrap.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use securedrop_auth::jwt::{AdminClaims, JwtDecoder, JwtEncoder};
use securedrop_auth::password::{PasswordHasher, PasswordValidator};
use securedrop_core::error::AppError;
use securedrop_database::repositories::AdminRepository;
use securedrop_entity::admin::{Admin, CreateAdmin};

/// Result of a successful admin login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLogin {
    /// The signed bearer credential.
    pub access_token: String,
    /// When it expires.
    pub expires_at: DateTime<Utc>,
    /// The authenticated admin.
    pub admin: Admin,
}

/// Authenticates administrators.
#[derive(Debug, Clone)]
pub struct AdminAuthService {
    /// Admin repository.
    admin_repo: Arc<AdminRepository>,
    /// Password hasher.
    hasher: Arc<PasswordHasher>,
    /// Password policy.
    validator: Arc<PasswordValidator>,
    /// Credential signer.
    encoder: Arc<JwtEncoder>,
    /// Credential verifier.
    decoder: Arc<JwtDecoder>,
}

impl AdminAuthService {
    /// Creates a new admin auth service.
    pub fn new(
        admin_repo: Arc<AdminRepository>,
        hasher: Arc<PasswordHasher>,
        validator: Arc<PasswordValidator>,
        encoder: Arc<JwtEncoder>,
        decoder: Arc<JwtDecoder>,
    ) -> Self {
        Self {
            admin_repo,
            hasher,
            validator,
            encoder,
            decoder,
        }
    }

    /// Checks credentials and issues a bearer.
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    pub async fn login(&self, username: &str, password: &str) -> Result<AdminLogin, AppError> {
        let Some(admin) = self.admin_repo.find_by_username(username).await? else {
            self.hasher.verify_dummy(password);
            warn!(username, "Admin login failed");
            return Err(AppError::unauthorized("Invalid username or password"));
        };

        if !self.hasher.verify_password(password, &admin.password_hash)? {
            warn!(username, "Admin login failed");
            return Err(AppError::unauthorized("Invalid username or password"));
        }

        let issued = self.encoder.issue_admin(admin.id, &admin.username)?;
        info!(admin_id = admin.id, username = %admin.username, "Admin logged in");

        Ok(AdminLogin {
            access_token: issued.token,
            expires_at: issued.expires_at,
            admin,
        })
    }

    /// Verifies a bearer and checks that its admin still exists.
    pub async fn authenticate(&self, bearer: &str) -> Result<AdminClaims, AppError> {
        let claims = self.decoder.decode_admin(bearer)?;
        if self.admin_repo.find_by_id(claims.admin_id()).await?.is_none() {
            return Err(AppError::unauthorized("Admin account no longer exists"));
        }
        Ok(claims)
    }

    /// Creates an admin account.
    pub async fn create_admin(&self, username: &str, password: &str) -> Result<Admin, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::validation("Username must not be empty"));
        }
        self.validator.validate(password)?;

        if self.admin_repo.find_by_username(username).await?.is_some() {
            return Err(AppError::conflict(format!(
                "Admin '{username}' already exists"
            )));
        }

        let admin = self
            .admin_repo
            .create(&CreateAdmin {
                username: username.to_string(),
                password_hash: self.hasher.hash_password(password)?,
            })
            .await?;

        info!(admin_id = admin.id, username = %admin.username, "Admin created");
        Ok(admin)
    }

    /// Replaces an admin's password.
    pub async fn reset_password(&self, username: &str, new_password: &str) -> Result<(), AppError> {
        self.validator.validate(new_password)?;

        let admin = self
            .admin_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Admin '{username}' not found")))?;

        let hash = self.hasher.hash_password(new_password)?;
        self.admin_repo.update_password(admin.id, &hash).await?;

        info!(admin_id = admin.id, "Admin password reset");
        Ok(())
    }
}
