//! Registration, credential checks and password maintenance.
//!
//! Token issuance lives at the HTTP boundary; this service only decides
//! whether a set of credentials identifies an approved account.

use db::models::user::{ApprovalStatus, User, UserRole};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

/// Job titles that register with administrative rights.
const ADMIN_JOB_TITLES: &[&str] = &["manager", "nurse", "senior carer"];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email is already taken")]
    UsernameTaken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("awaiting admin approval")]
    PendingApproval,
    #[error("user not found")]
    UserNotFound,
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RegisterStaff {
    pub username: String,
    pub password: String,
    pub fullname: Option<String>,
    pub job_title: Option<String>,
}

pub struct AuthService;

impl AuthService {
    /// Create a new account in `pending` status. The job title decides the
    /// role: managerial and nursing titles register as admins.
    pub async fn register(pool: &SqlitePool, data: &RegisterStaff) -> Result<User, AuthError> {
        if User::find_by_username(pool, &data.username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let role = match &data.job_title {
            Some(title) if ADMIN_JOB_TITLES.contains(&title.to_lowercase().as_str()) => {
                UserRole::Admin
            }
            _ => UserRole::Regular,
        };
        let password_hash = bcrypt::hash(&data.password, bcrypt::DEFAULT_COST)?;

        let user = User::create(
            pool,
            Uuid::new_v4(),
            &data.username,
            data.fullname.as_deref().unwrap_or(""),
            &password_hash,
            role,
            data.job_title.as_deref(),
        )
        .await?;
        info!(user_id = %user.id, role = %user.role, "staff member registered");
        Ok(user)
    }

    /// Verify credentials. Pending accounts are refused with a distinct
    /// error so the client can tell the user to wait for approval.
    pub async fn login(
        pool: &SqlitePool,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user = User::find_by_username(pool, username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if user.status == ApprovalStatus::Pending {
            return Err(AuthError::PendingApproval);
        }
        if !bcrypt::verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn update_password(
        pool: &SqlitePool,
        username: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let password_hash = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)?;
        if User::update_password_hash(pool, username, &password_hash).await? == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }
}
